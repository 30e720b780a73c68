use bt_core::{Context, ModelTask};

#[test]
fn basic_context_reports_previous_visibility() {
    let ctx = Context::new();
    assert!(!ctx.set_variable("hp", 10i32));
    assert!(ctx.set_variable("hp", 7i32));
    assert_eq!(ctx.get::<i32>("hp"), Some(7));

    assert!(ctx.clear_variable("hp"));
    assert!(!ctx.clear_variable("hp"));
    assert_eq!(ctx.get::<i32>("hp"), None);
}

#[test]
#[should_panic(expected = "context type mismatch")]
fn typed_read_panics_on_wrong_type() {
    let ctx = Context::new();
    ctx.set_variable("hp", 10i32);
    let _ = ctx.get::<String>("hp");
}

#[test]
fn clones_share_one_store() {
    let ctx = Context::new();
    let alias = ctx.clone();
    alias.set_variable("seen", true);
    assert_eq!(ctx.get::<bool>("seen"), Some(true));
    assert!(ctx.ptr_eq(&alias));
}

#[test]
fn hierarchical_reads_fall_back_and_writes_stay_local() {
    let parent = Context::new();
    parent.set_variable("target", "door".to_string());
    let child = Context::hierarchical(&parent);

    assert_eq!(child.get::<String>("target").as_deref(), Some("door"));

    // Shadow the parent's value locally.
    assert!(child.set_variable("target", "window".to_string()));
    assert_eq!(child.get::<String>("target").as_deref(), Some("window"));
    assert_eq!(parent.get::<String>("target").as_deref(), Some("door"));

    // Clearing the local layer uncovers the parent again.
    child.clear_variable("target");
    assert_eq!(child.get::<String>("target").as_deref(), Some("door"));
    assert_eq!(child.local_names(), Vec::<String>::new());
}

#[test]
fn safe_context_never_modifies_its_input() {
    let input = Context::new();
    input.set_variable("ammo", 3u32);
    let safe = Context::safe(&input);

    assert_eq!(safe.get::<u32>("ammo"), Some(3));
    safe.set_variable("ammo", 0u32);
    safe.set_variable("scratch", 1u8);
    assert_eq!(safe.get::<u32>("ammo"), Some(0));
    assert_eq!(input.get::<u32>("ammo"), Some(3));
    assert!(!input.contains("scratch"));

    // Once cleared locally the input's value stays hidden.
    assert!(safe.clear_variable("ammo"));
    assert!(!safe.contains("ammo"));
    assert!(input.contains("ammo"));
}

#[test]
fn clearing_a_safe_context_detaches_it_from_input() {
    let input = Context::new();
    input.set_variable("a", 1i32);
    let safe = Context::safe(&input);
    safe.set_variable("b", 2i32);

    safe.clear();
    assert!(!safe.contains("a"));
    assert!(!safe.contains("b"));
    assert_eq!(input.get::<i32>("a"), Some(1));
}

#[test]
fn safe_output_writes_declared_outputs_through() {
    let input = Context::new();
    let ctx = Context::safe_output(&input, ["result"]);

    ctx.set_variable("result", 42i64);
    ctx.set_variable("temp", 1i64);
    assert_eq!(input.get::<i64>("result"), Some(42));
    assert!(!input.contains("temp"));

    assert!(ctx.clear_variable("result"));
    assert!(!input.contains("result"));
}

#[test]
fn named_trees_resolve_through_derived_contexts() {
    let root = Context::new();
    assert!(!root.set_named_tree("patrol", ModelTask::success()));
    assert!(root.set_named_tree("patrol", ModelTask::wait(2)));

    let nested = Context::safe(&Context::hierarchical(&root));
    let tree = nested.get_named_tree("patrol").map(|t| t.label().to_string());
    assert_eq!(tree.as_deref(), Some("wait"));
    assert!(nested.get_named_tree("missing").is_none());
}
