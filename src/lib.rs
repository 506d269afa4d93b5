#![allow(clippy::too_many_arguments)]

pub mod logger;

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod editor;
pub mod frame;
pub mod io;
pub mod render;
pub mod settings;
pub mod template;
pub mod viewport;
