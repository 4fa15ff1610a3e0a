pub mod gemini;
pub mod mercadopago;
pub mod tokens;
pub mod users;

pub use gemini::GeminiClient;
pub use mercadopago::{MercadoPagoClient, PaymentError};
pub use tokens::{TokenError, TokenIssuer};
pub use users::{PaidTransition, StoreError, UserStore};
