pub mod document;
pub mod postgres;

pub mod alumni {
    pub mod mutators;
    pub mod selectors;
    pub mod spec;
}

pub mod files {
    pub mod mutators;
    pub mod selectors;
    pub mod spec;
}

pub mod jobs {
    pub mod mutators;
    pub mod selectors;
    pub mod spec;
}

pub mod users {
    pub mod mutators;
    pub mod selectors;
    pub mod spec;
}
