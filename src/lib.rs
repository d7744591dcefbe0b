pub mod errors;

pub mod schema;
pub mod modules;
pub mod routes {
    pub mod api {
        pub mod lap;
    }
}

pub(crate) mod macros {
    pub(crate) mod request_caching;
}
