mod account;
mod payment;

pub use account::{
    DashboardStats, LogPage, LogRecord, LoginResponse, Me, Profile, RefreshResponse,
    ResetTokenResponse, Role, UserRecord,
};
pub use payment::{NumericField, PaymentColumn, PaymentRecord};
