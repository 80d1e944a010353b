/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `attendance`: Scan toggle and on-demand auto-checkout
/// - `badge`: QR badge generation

pub mod attendance;
pub mod badge;
pub mod health;
