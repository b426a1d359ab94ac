pub mod doctor;
pub mod matching;
pub mod rate_limit;
pub mod seed;

pub use doctor::DoctorService;
pub use matching::MatchingService;
pub use rate_limit::RateLimitService;
pub use seed::SeedService;
