//! Storage infrastructure - Variant store implementations

mod cookie;
mod factory;
mod local;

pub use cookie::{
    format_cookie_date, CookieJar, CookieVariantStore, InMemoryCookieJar, StoredCookie,
    COOKIE_MAX_AGE_DAYS, EXPIRED_DATE,
};
pub use factory::DefaultVariantStoreFactory;
pub use local::{InMemoryStorageArea, LocalVariantStore, StorageArea};
