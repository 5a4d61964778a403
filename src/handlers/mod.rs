// Route handlers, one module per resource.
//
// Public: GET on companies and jobs, /auth/token, /auth/register
// Logged in: /auth/whoami
// Same user or admin: /users/:username and its applications
// Admin: POST, PATCH and DELETE on companies and jobs; POST and GET /users
pub mod auth;
pub mod companies;
pub mod jobs;
pub mod users;

use serde::Serialize;

/// Body of a successful DELETE.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: String,
}
