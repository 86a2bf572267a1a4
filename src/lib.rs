pub mod core {
    pub mod config;
    pub mod error;
    pub mod routes;
    pub mod startup;
    pub mod state;
    pub mod tracing_init;
}

pub mod api {
    pub mod client;
    pub mod response;
}

pub mod models {
    pub mod catalog;
    pub mod friend;
    pub mod user;
}

pub mod stores {
    pub mod preferences;
    pub mod storage;
    pub mod user_store;
}

pub mod sync {
    pub mod bus;
    pub mod hash;
    pub mod manager;
    pub mod merge;
}

pub mod media {
    pub mod compressor;
}

pub mod services {
    pub mod admin;
    pub mod friends;
    pub mod launcher;
    pub mod status;
}

pub mod dashboard {
    pub mod controller;
    pub mod labels;
    pub mod navigation;
    pub mod notifications;
}

pub mod validation {
    pub mod launcher;
}

pub mod handlers {
    pub mod fallback;
    pub mod health;
    pub mod static_files;
}

pub mod utils {
    pub mod time;
}

#[cfg(test)]
pub mod test_support;
