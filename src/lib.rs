//! uBlog - A small personal blogging website
//!
//! Visitors browse articles; registered users log in and write, edit and
//! delete their own posts.

pub mod api;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod session;
pub mod theme;
