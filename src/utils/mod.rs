pub mod clock;
pub mod email_registry;
pub mod evidence;
pub mod notifier;
pub mod time_format;
