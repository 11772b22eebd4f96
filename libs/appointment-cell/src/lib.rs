pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Appointment, AppointmentError, AppointmentStatus, AvailableSlot, BookAppointmentRequest,
    Diagnosis, DoctorSummary, SchedulingRules, UpdateAppointmentRequest,
};
pub use router::appointment_routes;
