//! Whomi - OpenID Connect relying-party demo.
//!
//! A server-rendered web app that signs a user in against any OpenID
//! Connect provider and shows who they are: claims, raw tokens, and
//! decoded token payloads.

pub mod auth;
pub mod token;
pub mod web;
