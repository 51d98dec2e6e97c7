//! Application services composing the dispatcher, registries and read models.

pub mod origin_names;
