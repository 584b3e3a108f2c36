// SPDX-License-Identifier: MPL-2.0
//! `pdf_album` is a small drag-and-drop utility, built with the Iced GUI
//! framework, that binds JPEG and PNG images into a single A4 PDF document:
//! one image per page, centered and scaled to fit, with EXIF-aware rotation
//! correction and an optional auto-rotate to match the page orientation.

pub mod app;
pub mod compose;
pub mod config;
pub mod error;
pub mod i18n;
pub mod image_list;
