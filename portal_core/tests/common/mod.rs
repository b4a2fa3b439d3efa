pub mod fake_shell;
