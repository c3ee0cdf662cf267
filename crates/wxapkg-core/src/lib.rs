//! Core of JaySenWxapkg: decrypt, unpack and scan WeChat mini-program packages.

pub mod config;
pub mod logging;

pub mod app_info;
pub mod appid;
pub mod checksum;
pub mod crypto;
pub mod package;
pub mod pipeline;
pub mod scan;
