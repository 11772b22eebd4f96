pub mod diagnosis;
pub mod doctor;

pub use diagnosis::DiagnosisService;
pub use doctor::DoctorService;
