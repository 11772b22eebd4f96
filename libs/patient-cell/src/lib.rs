pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    MedicalHistory, Patient, PatientError, PatientSummary, UpdateMedicalHistoryRequest,
    UpdatePatientProfileRequest,
};
pub use router::{medical_history_routes, patient_routes};
