pub mod history;
pub mod patient;

pub use history::MedicalHistoryService;
pub use patient::PatientService;
