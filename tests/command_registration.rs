use std::collections::HashSet;

use ai_queue_bot::commands;

#[test]
fn test_all_commands_returns_correct_count() {
    let cmds = commands::all();
    assert_eq!(
        cmds.len(),
        8,
        "Expected 8 commands (1 help + 3 AI + 3 aliases + 1 aiqueue), got {}",
        cmds.len()
    );
}

#[test]
fn test_all_commands_contain_expected_names() {
    let cmds = commands::all();
    let names: HashSet<&str> = cmds.iter().map(|cmd| cmd.name.as_str()).collect();

    let expected = [
        "help",
        "ask",
        "a",
        "translate",
        "tr",
        "trivia",
        "quiz",
        "aiqueue",
    ];

    for name in &expected {
        assert!(
            names.contains(name),
            "Expected command '{}' not found in commands::all(). Present names: {:?}",
            name,
            names
        );
    }
}

#[test]
fn test_aiqueue_subcommands() {
    let cmds = commands::all();
    let aiqueue = cmds
        .iter()
        .find(|cmd| cmd.name == "aiqueue")
        .expect("aiqueue command missing");

    let subcommands: HashSet<&str> = aiqueue
        .subcommands
        .iter()
        .map(|cmd| cmd.name.as_str())
        .collect();
    assert_eq!(subcommands, HashSet::from(["status", "cancel", "clear"]));
    assert!(aiqueue.subcommand_required);

    let clear = aiqueue
        .subcommands
        .iter()
        .find(|cmd| cmd.name == "clear")
        .unwrap();
    assert!(clear
        .required_permissions
        .contains(poise::serenity_prelude::Permissions::MANAGE_MESSAGES));
}

#[test]
fn test_no_duplicate_command_names() {
    let cmds = commands::all();
    let mut seen = HashSet::new();

    for cmd in &cmds {
        assert!(
            seen.insert(cmd.name.as_str()),
            "Duplicate command name found: '{}'",
            cmd.name
        );
    }
}

#[test]
fn test_all_commands_are_slash_commands() {
    let cmds = commands::all();

    for cmd in &cmds {
        assert!(
            cmd.slash_action.is_some() || !cmd.subcommands.is_empty(),
            "Command '{}' does not have slash_action set (not a slash command)",
            cmd.name
        );
    }
}
