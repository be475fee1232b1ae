//! Story Refiner - Multi-role user story refinement service
//!
//! A product manager submits a draft user story and picks the roles that
//! should review it. An AI assistant plays those roles over one conversation
//! thread: it asks questions, offers suggestions and finally rewrites the
//! story with acceptance criteria.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
