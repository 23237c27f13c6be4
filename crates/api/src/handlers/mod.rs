pub mod auth;
pub mod qr;
pub mod qualification;
pub mod question;
pub mod ranking_points;
pub mod session;
pub mod student;
pub mod survey;
pub mod venue;
