use rand::distr::{Alphanumeric, SampleString};

use crate::store::Store;

pub fn random_string() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 16)
}

pub async fn redis_store() -> Result<Store, crate::ForemanError> {
    dotenvy::from_filename(".env.test").ok();
    let redis_url = std::env::var("REDIS_URL").expect("REDIS_URL is not set");
    Store::connect(&redis_url)
}
