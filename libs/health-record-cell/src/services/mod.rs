pub mod medical_history;
pub mod prescription;

pub use medical_history::MedicalHistoryService;
pub use prescription::PrescriptionService;
