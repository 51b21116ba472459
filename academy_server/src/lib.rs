//! # Academy server
//! This crate hosts the HTTP server for the academy platform. It is responsible for:
//! * Accepting enrollments and driving their checkout through the payment gateway.
//! * Verifying payment signatures from the browser and reconciling payments reported by gateway webhooks.
//! * Registering users, logging them in and guarding the back office with role-based access control.
//! * Serving the public course catalog.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! Public routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /enrollments`: Creates an enrollment.
//! * `POST /payments/create-order`: Creates (or re-issues) a gateway order for an enrollment.
//! * `POST /payments/verify`: Verifies a completed checkout and marks the enrollment as paid.
//! * `POST /payments/webhook`: Gateway notifications. Requests must carry a valid `X-Razorpay-Signature`.
//! * `POST /auth/register`, `POST /auth/verify-email`, `POST /auth/login`, `POST /auth/logout`
//! * `GET /catalog/{kind}`, `GET /catalog/{kind}/{slug}`: Published catalog items.
//!
//! Routes under `/api` need an access token, in the `academy_token` cookie or an `Authorization: Bearer` header:
//! * `GET /api/me`, `GET /api/dashboard/enrollments`
//! * Admin only: `GET /api/admin/enrollments`, `PATCH /api/admin/enrollments/{id}/cancel`,
//!   `GET /api/admin/enrollments/{id}/payments`, `POST /api/admin/users`
//! * Admins and instructors: `POST /api/admin/catalog`, `PATCH /api/admin/catalog/{id}`

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
