pub mod stamp_service;
