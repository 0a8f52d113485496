use shared::messages::{
    ErrorMessage, Estimate, EstimateQuery, Health, PredictionQuery, ReportSighting,
};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::forecast::ForecastSource;

pub async fn run<F: ForecastSource + 'static>(address: std::net::SocketAddr, engine: Engine<F>) {
    log::info!("Listening on {}", address);
    warp::serve(routes(Arc::new(engine))).run(address).await
}

pub fn routes<F: ForecastSource + 'static>(
    engine: Arc<Engine<F>>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health_route = warp::path!("health")
        .and(warp::get())
        .and(with_engine(engine.clone()))
        .and_then(health);

    let report_route = warp::path!("sightings")
        .and(warp::post())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::json())
        .and(with_engine(engine.clone()))
        .and_then(report_sighting);

    let latest_route = warp::path!("sightings" / "latest")
        .and(warp::get())
        .and(with_engine(engine.clone()))
        .and_then(latest_sighting);

    let prediction_route = warp::path!("predictions")
        .and(warp::get())
        .and(warp::query::<PredictionQuery>())
        .and(with_engine(engine.clone()))
        .and_then(prediction);

    let estimate_route = warp::path!("estimates")
        .and(warp::get())
        .and(warp::query::<EstimateQuery>())
        .and(with_engine(engine))
        .and_then(estimate);

    health_route
        .or(report_route)
        .or(latest_route)
        .or(prediction_route)
        .or(estimate_route)
        .recover(rejection)
}

fn with_engine<F: ForecastSource + 'static>(
    engine: Arc<Engine<F>>,
) -> impl Filter<Extract = (Arc<Engine<F>>,), Error = Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

async fn health<F: ForecastSource>(engine: Arc<Engine<F>>) -> Result<impl Reply, Rejection> {
    let sightings = engine.sighting_count().await.map_err(reject)?;
    Ok(warp::reply::json(&Health { sightings }))
}

async fn report_sighting<F: ForecastSource>(
    report: ReportSighting,
    engine: Arc<Engine<F>>,
) -> Result<impl Reply, Rejection> {
    let sighting = engine
        .record_sighting(
            report.latitude,
            report.longitude,
            report.quantity,
            &report.category,
        )
        .await
        .map_err(reject)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&sighting),
        StatusCode::CREATED,
    ))
}

async fn latest_sighting<F: ForecastSource>(
    engine: Arc<Engine<F>>,
) -> Result<impl Reply, Rejection> {
    let sighting = engine.latest_sighting().await.map_err(reject)?;
    Ok(warp::reply::json(&sighting))
}

async fn prediction<F: ForecastSource>(
    query: PredictionQuery,
    engine: Arc<Engine<F>>,
) -> Result<impl Reply, Rejection> {
    let prediction = engine.predict_drift(query.days).await.map_err(reject)?;
    Ok(warp::reply::json(&prediction))
}

async fn estimate<F: ForecastSource>(
    query: EstimateQuery,
    engine: Arc<Engine<F>>,
) -> Result<impl Reply, Rejection> {
    let estimate = engine.estimate_quantity(query.lat, query.lng).await;
    Ok(warp::reply::json(&Estimate { estimate }))
}

#[derive(Debug)]
struct Error(EngineError);
impl warp::reject::Reject for Error {}

fn reject(err: EngineError) -> Rejection {
    warp::reject::custom(Error(err))
}

fn status_of(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::NotFound => StatusCode::NOT_FOUND,
        EngineError::ForecastUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if let Some(Error(engine_err)) = err.find::<Error>() {
        let code = status_of(engine_err);
        if code == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("Error: {}", engine_err);
            (code, "Internal server error.".to_string())
        } else {
            (code, engine_err.to_string())
        }
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found.".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.".to_string())
    } else {
        log::error!("Error: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error.".to_string(),
        )
    };

    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message,
    });

    Ok(warp::reply::with_status(json, code))
}
