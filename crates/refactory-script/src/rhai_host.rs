//! Rhai-backed script host.
//!
//! Each robot script is a Rhai program defining `fn update(robot)`. The
//! host compiles it once per source revision, then calls `update` with a
//! fresh [`ScriptRobot`] per invocation. The engine is locked down: no
//! module imports, no `eval`, bounded call depth and collection sizes, an
//! operation budget and a wall-clock deadline checked from the progress
//! callback. `print` and `debug` go to `tracing`.

use std::cell::Cell;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::time::Instant;

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{
    AST, Array, CallFnOptions, Dynamic, Engine, EvalAltResult, ImmutableString, Map, Scope,
};
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info};

use refactory_robots::{ActionError, ActionOutcome, Sensed};
use refactory_types::{Position, RobotId, ScriptId, SenseKind};

use crate::capability::ScriptRobot;
use crate::error::ScriptFault;
use crate::host::{ScriptBudget, ScriptHost, ScriptSource};

const ENTRY_POINT: &str = "update";
const PROGRESS_CHECK_MASK: u64 = 0xFF;
const MAX_EXPR_DEPTH: usize = 64;
const MAX_FN_EXPR_DEPTH: usize = 32;
const MAX_STRING_SIZE: usize = 16 * 1024;
const MAX_ARRAY_SIZE: usize = 1024;
const MAX_MAP_SIZE: usize = 256;

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

enum Program {
    Compiled { ast: Box<AST>, has_entry: bool },
    Failed(String),
}

struct CacheEntry {
    digest: u64,
    program: Program,
}

/// Sandboxed Rhai interpreter shared by every robot.
pub struct RhaiScriptHost {
    engine: Engine,
    cache: HashMap<ScriptId, CacheEntry>,
    deadline: Rc<Cell<Option<Instant>>>,
    current: Rc<Cell<Option<RobotId>>>,
}

impl std::fmt::Debug for RhaiScriptHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiScriptHost")
            .field("cached_scripts", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Default for RhaiScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiScriptHost {
    /// Build a locked-down engine with the robot API registered.
    pub fn new() -> Self {
        let deadline: Rc<Cell<Option<Instant>>> = Rc::new(Cell::new(None));
        let current: Rc<Cell<Option<RobotId>>> = Rc::new(Cell::new(None));

        let mut engine = Engine::new();
        engine
            .set_module_resolver(DummyModuleResolver::new())
            .set_max_expr_depths(MAX_EXPR_DEPTH, MAX_FN_EXPR_DEPTH)
            .set_max_string_size(MAX_STRING_SIZE)
            .set_max_array_size(MAX_ARRAY_SIZE)
            .set_max_map_size(MAX_MAP_SIZE);
        engine.disable_symbol("eval");

        let print_robot = Rc::clone(&current);
        engine.on_print(move |text| {
            info!(robot_id = ?print_robot.get(), "{text}");
        });
        let debug_robot = Rc::clone(&current);
        engine.on_debug(move |text, _source, pos| {
            debug!(robot_id = ?debug_robot.get(), position = %pos, "{text}");
        });
        let progress_deadline = Rc::clone(&deadline);
        engine.on_progress(move |ops| {
            if ops & PROGRESS_CHECK_MASK != 0 {
                return None;
            }
            match progress_deadline.get() {
                Some(limit) if Instant::now() >= limit => Some(Dynamic::from("deadline")),
                _ => None,
            }
        });

        register_robot_api(&mut engine);

        Self {
            engine,
            cache: HashMap::new(),
            deadline,
            current,
        }
    }

    /// Number of compiled programs held.
    pub fn cached_scripts(&self) -> usize {
        self.cache.len()
    }

    /// Drop the compiled form of `script`.
    pub fn forget(&mut self, script: ScriptId) {
        self.cache.remove(&script);
    }

    /// Compile `text` without running it, reporting the first error.
    pub fn check(&self, text: &str) -> Result<(), ScriptFault> {
        self.engine
            .compile(text)
            .map(drop)
            .map_err(|err| ScriptFault::Compile {
                message: err.to_string(),
            })
    }
}

impl ScriptHost for RhaiScriptHost {
    fn invoke(
        &mut self,
        script: &ScriptSource<'_>,
        robot: ScriptRobot,
        budget: &ScriptBudget,
    ) -> Result<(), ScriptFault> {
        self.engine
            .set_max_operations(budget.max_operations)
            .set_max_call_levels(budget.max_call_levels);

        let Some(ast) = compile_cached(&self.engine, &mut self.cache, script)? else {
            return Ok(());
        };

        self.current.set(Some(robot.robot_id()));
        self.deadline
            .set(Instant::now().checked_add(budget.wall_clock()));
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        let result = self.engine.call_fn_with_options::<Dynamic>(
            options,
            &mut Scope::new(),
            ast,
            ENTRY_POINT,
            (robot,),
        );
        self.deadline.set(None);
        self.current.set(None);

        match result {
            Ok(_) => Ok(()),
            Err(err) => Err(classify(*err, budget)),
        }
    }
}

fn digest(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Compiled `update` for `script`, or `None` when it defines none.
fn compile_cached<'c>(
    engine: &Engine,
    cache: &'c mut HashMap<ScriptId, CacheEntry>,
    script: &ScriptSource<'_>,
) -> Result<Option<&'c AST>, ScriptFault> {
    let digest = digest(script.text);
    let stale = cache.get(&script.id).is_none_or(|entry| entry.digest != digest);
    if stale {
        let program = match engine.compile(script.text) {
            Ok(ast) => {
                let has_entry = ast
                    .iter_functions()
                    .any(|f| f.name == ENTRY_POINT && f.params.len() == 1);
                Program::Compiled {
                    ast: Box::new(ast),
                    has_entry,
                }
            }
            Err(err) => Program::Failed(err.to_string()),
        };
        debug!(script_id = %script.id, "script compiled");
        cache.insert(script.id, CacheEntry { digest, program });
    }

    match cache.get(&script.id).map(|entry| &entry.program) {
        Some(Program::Compiled { ast, has_entry: true }) => Ok(Some(ast.as_ref())),
        Some(Program::Compiled { has_entry: false, .. }) | None => Ok(None),
        Some(Program::Failed(message)) => Err(ScriptFault::Compile {
            message: message.clone(),
        }),
    }
}

/// Map an interpreter error onto a fault, looking through call wrappers.
fn classify(err: EvalAltResult, budget: &ScriptBudget) -> ScriptFault {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => classify(*inner, budget),
        EvalAltResult::ErrorTooManyOperations(_) => ScriptFault::BudgetExceeded {
            limit: budget.max_operations,
        },
        EvalAltResult::ErrorTerminated(_, _) => ScriptFault::Timeout {
            limit: budget.wall_clock(),
        },
        EvalAltResult::ErrorRuntime(value, pos) if value.is::<ActionError>() => value
            .try_cast::<ActionError>()
            .map_or_else(
                || ScriptFault::runtime(format!("action failed at {pos}")),
                |source| ScriptFault::Action { source },
            ),
        EvalAltResult::ErrorRuntime(value, pos) => ScriptFault::runtime(format!("{value} at {pos}")),
        EvalAltResult::ErrorParsing(kind, pos) => ScriptFault::Compile {
            message: format!("{kind} at {pos}"),
        },
        other => ScriptFault::runtime(other.to_string()),
    }
}

fn action_failed(err: ActionError) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(err),
        rhai::Position::NONE,
    ))
}

fn bad_argument(message: impl Into<String>) -> Box<EvalAltResult> {
    action_failed(ActionError::invalid(message))
}

fn number(value: &Dynamic, what: &str) -> RhaiResult<f64> {
    value
        .as_float()
        .or_else(|_| value.as_int().map(|i| i as f64))
        .ok()
        .ok_or_else(|| bad_argument(format!("{what} must be a number, got {}", value.type_name())))
}

/// Identifier from a string or from a sensed entry's `id` field.
fn target_ref(value: Dynamic) -> RhaiResult<String> {
    if value.is_string() {
        return value
            .into_string()
            .ok()
            .ok_or_else(|| bad_argument("target id must be a string"));
    }
    if value.is_map() {
        let id = value
            .try_cast::<Map>()
            .and_then(|map| map.get("id").cloned())
            .and_then(|id| id.into_string().ok());
        return id.ok_or_else(|| bad_argument("target map has no string `id` field"));
    }
    Err(bad_argument(format!(
        "target must be an id string or a sensed entry, got {}",
        value.type_name()
    )))
}

fn position_map(position: Position) -> Map {
    let mut map = Map::new();
    map.insert("x".into(), Dynamic::from_float(position.x));
    map.insert("y".into(), Dynamic::from_float(position.y));
    map
}

fn sensed_array(hits: Vec<Sensed>) -> Array {
    hits.into_iter()
        .map(|hit| {
            let category = match hit.kind {
                refactory_robots::SensedKind::Resource(_) => "resource",
                refactory_robots::SensedKind::Machine(_) => "machine",
            };
            let mut map = position_map(hit.position);
            map.insert("id".into(), Dynamic::from(hit.id));
            map.insert("kind".into(), Dynamic::from(hit.kind.as_str().to_owned()));
            map.insert("category".into(), Dynamic::from(category.to_owned()));
            map.insert("distance".into(), Dynamic::from_float(hit.distance));
            map.insert(
                "amount".into(),
                Dynamic::from_int(i64::try_from(hit.amount).unwrap_or(i64::MAX)),
            );
            Dynamic::from_map(map)
        })
        .collect()
}

fn sense(robot: &ScriptRobot, radius: &Dynamic, kind: SenseKind) -> RhaiResult<Array> {
    let radius = number(radius, "radius")?;
    robot
        .sense(radius, kind)
        .map(sensed_array)
        .map_err(action_failed)
}

fn register_robot_api(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptRobot>("Robot");
    engine
        .register_type_with_name::<ActionError>("ActionError")
        .register_fn("to_string", |err: &mut ActionError| err.to_string())
        .register_get("kind", |err: &mut ActionError| err.kind().as_str().to_owned());

    engine.register_fn("position", |r: &mut ScriptRobot| -> RhaiResult<Map> {
        r.position().map(position_map).map_err(action_failed)
    });
    engine.register_fn("inventory", |r: &mut ScriptRobot| -> RhaiResult<Map> {
        let inventory = r.inventory().map_err(action_failed)?;
        let mut map = Map::new();
        map.insert(
            "kind".into(),
            inventory
                .kind
                .map_or(Dynamic::UNIT, |kind| Dynamic::from(kind.as_str().to_owned())),
        );
        map.insert("amount".into(), Dynamic::from_int(i64::from(inventory.amount)));
        Ok(map)
    });
    engine.register_fn("status", |r: &mut ScriptRobot| -> RhaiResult<String> {
        r.status()
            .map(|status| status.as_str().to_owned())
            .map_err(action_failed)
    });
    engine.register_fn("energy", |r: &mut ScriptRobot| -> RhaiResult<f64> {
        r.energy()
            .map(|energy| energy.to_f64().unwrap_or(0.0))
            .map_err(action_failed)
    });
    engine.register_fn(
        "sense",
        |r: &mut ScriptRobot, radius: Dynamic, kind: ImmutableString| -> RhaiResult<Array> {
            let kind = kind
                .as_str()
                .parse::<SenseKind>()
                .map_err(|err| bad_argument(err.to_string()))?;
            sense(r, &radius, kind)
        },
    );
    engine.register_fn(
        "scan_resources",
        |r: &mut ScriptRobot, radius: Dynamic| -> RhaiResult<Array> {
            sense(r, &radius, SenseKind::Resources)
        },
    );
    engine.register_fn(
        "scan_machines",
        |r: &mut ScriptRobot, radius: Dynamic| -> RhaiResult<Array> {
            sense(r, &radius, SenseKind::Machines)
        },
    );
    engine.register_fn(
        "move_to",
        |r: &mut ScriptRobot, x: Dynamic, y: Dynamic| -> RhaiResult<bool> {
            let target = Position::new(number(&x, "x")?, number(&y, "y")?);
            r.move_to(target)
                .map(ActionOutcome::performed)
                .map_err(action_failed)
        },
    );
    engine.register_fn(
        "pickup",
        |r: &mut ScriptRobot, target: Dynamic| -> RhaiResult<bool> {
            let id = target_ref(target)?;
            r.pickup_ref(&id)
                .map(ActionOutcome::performed)
                .map_err(action_failed)
        },
    );
    engine.register_fn(
        "dropoff",
        |r: &mut ScriptRobot, target: Dynamic| -> RhaiResult<bool> {
            let id = target_ref(target)?;
            r.dropoff_ref(&id)
                .map(ActionOutcome::performed)
                .map_err(action_failed)
        },
    );
    engine.register_fn("log", |r: &mut ScriptRobot, text: ImmutableString| {
        info!(robot_id = %r.robot_id(), "{text}");
    });
}
