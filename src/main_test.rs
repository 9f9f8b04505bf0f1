use clap::CommandFactory;

use super::*;

fn env_of(name: &str) -> Option<String> {
    Cli::command()
        .get_arguments()
        .find(|arg| arg.get_id() == name)
        .and_then(|arg| arg.get_env())
        .map(|env| env.to_string_lossy().into_owned())
}

#[test]
fn flags_fall_back_to_environment() {
    assert_eq!(env_of("base_url").as_deref(), Some("FITCHAT_BASE_URL"));
    assert_eq!(env_of("transport").as_deref(), Some("FITCHAT_TRANSPORT"));
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn transport_flag_parses_mode() {
    let cli = Cli::try_parse_from(["fitchat", "--transport", "json", "chat"]).unwrap();
    assert_eq!(cli.transport, Some(TransportMode::Json));
    assert!(matches!(cli.command, Command::Chat));
}

#[test]
fn unknown_transport_is_rejected() {
    assert!(Cli::try_parse_from(["fitchat", "--transport", "carrier-pigeon", "chat"]).is_err());
}

#[test]
fn slash_commands_map_to_inputs() {
    assert!(matches!(parse_input("/quit"), Input::Quit));
    assert!(matches!(parse_input("/meal"), Input::Quick(QuickAction::Meal)));
    assert!(matches!(parse_input("/up"), Input::Rate(Rating::Up)));
    assert!(matches!(parse_input("  "), Input::Empty));
    assert!(matches!(parse_input("/dance"), Input::Unknown(ref c) if c == "dance"));
    assert!(matches!(parse_input("legs today"), Input::Prompt(ref p) if p == "legs today"));
}
