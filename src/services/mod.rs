pub mod account_service;
pub mod asset_store;
pub mod auth_service;
pub mod complaint_form;
pub mod complaint_service;
pub mod mailer;
pub mod notifications;
pub mod uploads;
