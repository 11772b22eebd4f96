pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{DiagnosisRequest, Doctor, DoctorError, DoctorListing, UpdateDoctorProfileRequest};
pub use router::doctor_routes;
