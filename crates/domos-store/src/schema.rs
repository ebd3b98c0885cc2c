//! Database schema
//!
//! Applied on every open; all statements are idempotent. The two edge tables
//! are indexed by their source column because every change event queries them,
//! and the value tables are indexed for newest-first history reads.

pub const SCHEMA: &str = r#"
    -- Registered modules and the RPCs they expose
    CREATE TABLE IF NOT EXISTS modules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        queue TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        descr TEXT
    );

    CREATE TABLE IF NOT EXISTS module_rpcs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        module_id INTEGER NOT NULL REFERENCES modules(id),
        kind TEXT NOT NULL,
        key TEXT NOT NULL,
        descr TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_module_rpcs_module ON module_rpcs(module_id);

    CREATE TABLE IF NOT EXISTS rpc_args (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rpc_id INTEGER NOT NULL REFERENCES module_rpcs(id),
        name TEXT NOT NULL,
        arg_type TEXT NOT NULL,
        optional INTEGER NOT NULL DEFAULT 0,
        descr TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_rpc_args_rpc ON rpc_args(rpc_id);

    -- Sensors, their provisioning arguments, and append-only history
    CREATE TABLE IF NOT EXISTS sensors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        module_id INTEGER NOT NULL REFERENCES modules(id),
        ident TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        instant INTEGER NOT NULL DEFAULT 0,
        descr TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_sensors_module ON sensors(module_id);

    CREATE TABLE IF NOT EXISTS sensor_args (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sensor_id INTEGER NOT NULL REFERENCES sensors(id),
        rpc_arg_id INTEGER NOT NULL REFERENCES rpc_args(id),
        value TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sensor_args_sensor ON sensor_args(sensor_id);

    CREATE TABLE IF NOT EXISTS sensor_values (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sensor_id INTEGER NOT NULL REFERENCES sensors(id),
        value TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sensor_values_history
        ON sensor_values(sensor_id, timestamp DESC);

    -- Stored formulas and their dependency edges. Edge row ids are the
    -- numbers embedded in __sens<id>__ / __trig<id>__ formula tokens.
    CREATE TABLE IF NOT EXISTS expressions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS var_sensors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        expression_id INTEGER NOT NULL REFERENCES expressions(id),
        sensor_id INTEGER NOT NULL REFERENCES sensors(id),
        function TEXT NOT NULL,
        args TEXT NOT NULL DEFAULT '[]'
    );

    CREATE INDEX IF NOT EXISTS idx_var_sensors_source ON var_sensors(sensor_id);
    CREATE INDEX IF NOT EXISTS idx_var_sensors_expression ON var_sensors(expression_id);

    CREATE TABLE IF NOT EXISTS var_triggers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        expression_id INTEGER NOT NULL REFERENCES expressions(id),
        trigger_id INTEGER NOT NULL REFERENCES triggers(id),
        function TEXT NOT NULL,
        args TEXT NOT NULL DEFAULT '[]'
    );

    CREATE INDEX IF NOT EXISTS idx_var_triggers_source ON var_triggers(trigger_id);
    CREATE INDEX IF NOT EXISTS idx_var_triggers_expression ON var_triggers(expression_id);

    -- Triggers, their recorded history, and action bindings
    CREATE TABLE IF NOT EXISTS triggers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        expression_id INTEGER NOT NULL REFERENCES expressions(id),
        record INTEGER NOT NULL DEFAULT 0,
        lastvalue TEXT,
        descr TEXT
    );

    CREATE TABLE IF NOT EXISTS trigger_values (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        trigger_id INTEGER NOT NULL REFERENCES triggers(id),
        value TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_trigger_values_history
        ON trigger_values(trigger_id, timestamp DESC);

    CREATE TABLE IF NOT EXISTS actions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        module_id INTEGER NOT NULL REFERENCES modules(id),
        ident TEXT NOT NULL,
        descr TEXT
    );

    CREATE TABLE IF NOT EXISTS action_args (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        action_id INTEGER NOT NULL REFERENCES actions(id),
        rpc_arg_id INTEGER NOT NULL REFERENCES rpc_args(id),
        expression_id INTEGER NOT NULL REFERENCES expressions(id)
    );

    CREATE INDEX IF NOT EXISTS idx_action_args_action ON action_args(action_id);

    CREATE TABLE IF NOT EXISTS trigger_actions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        trigger_id INTEGER NOT NULL REFERENCES triggers(id),
        action_id INTEGER NOT NULL REFERENCES actions(id),
        expression_id INTEGER NOT NULL REFERENCES expressions(id)
    );

    CREATE INDEX IF NOT EXISTS idx_trigger_actions_trigger ON trigger_actions(trigger_id);
"#;
