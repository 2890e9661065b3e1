use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AreaError {
    #[error("invalid projection `{definition}`: {message}")]
    Definition { definition: String, message: String },
    #[error("cannot project ({lon}, {lat}) into EPSG:{epsg}: {message}")]
    Transform {
        epsg: u32,
        lon: f64,
        lat: f64,
        message: String,
    },
}
