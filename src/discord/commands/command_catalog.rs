// Discord commands module.
// Each feature gets its own command file.

pub mod help;

pub mod reddit;
