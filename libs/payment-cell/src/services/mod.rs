pub mod mpesa;
pub mod payment;

pub use mpesa::MpesaClient;
pub use payment::PaymentService;
