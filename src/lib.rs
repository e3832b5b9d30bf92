pub mod compression;
pub mod errors;
pub mod field;
pub mod helpers;
pub mod request;
pub mod session;
pub mod websocket;

pub use compression::{gunzip, gzip};
pub use errors::{Error, Result};
pub use field::{init_upload_storage, upload_storage, Field, FormData, StorageMode};
pub use helpers::common::{ChunkBuffer, CHUNK_SIZE};
pub use helpers::traits::query_string::{parse_cookies, parse_parameters, QueryStringDecode};
pub use request::{ClientContext, CompressionMode, HttpRequest};
pub use session::SessionStore;
pub use websocket::{DeflateMode, MessageDeflater, MessageInflater};

pub mod external {
    #[cfg(feature = "env")]
    pub use dotenv;
    pub use flate2;
    pub use http;
    pub use mime_guess;
    pub use serde_json;
}

pub type SendableError = Box<dyn std::error::Error + Send + Sync>;

#[macro_export]
macro_rules! dev_print {
    ($($rest:tt)*) => {
        if cfg!(feature = "debug") {
            println!($($rest)*)
        }
    };
}
