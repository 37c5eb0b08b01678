//! The interpreter: singletons, frames, the evaluator, and the command
//! registration surface.

use indexmap::IndexSet;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use smallvec::SmallVec;

use crate::builtins;
use crate::error::{ErrorKind, Flow, Status, SzlError, SzlResult};
use crate::frame::Frame;
use crate::heap::{Heap, HeapStats, ObjId};
use crate::parse;
use crate::tracer::{ExecTracer, NoopTracer};
use crate::value::{CmdData, Command, Handler, Obj};

/// Default recursion ceiling for statement execution.
pub const DEFAULT_MAX_NESTING: usize = 128;

const SMALL_INT_CACHE: usize = 16;

/// Per-statement token and argument vector. Statements rarely carry more
/// than a dozen tokens, so these stay off the heap.
type ArgVec = SmallVec<[ObjId; 12]>;

/// Interpreter limits, settable at construction.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum statement nesting depth before `NestingLimit` is reported.
    pub max_nesting: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

/// One export of an extension bundle, installed via
/// [`Interp::register_extension`].
#[derive(Debug, Clone, Copy)]
pub enum ExtExport {
    Proc {
        name: &'static str,
        min_args: Option<usize>,
        max_args: Option<usize>,
        help: Option<&'static str>,
        handler: Handler,
    },
    ConstStr {
        name: &'static str,
        value: &'static str,
    },
    ConstInt {
        name: &'static str,
        value: i64,
    },
    ConstFloat {
        name: &'static str,
        value: f64,
    },
}

/// A szl interpreter instance.
///
/// Owns the value heap, the frame stack, the shared singletons, and the
/// extension registry. Not shareable between threads; all execution happens
/// on the caller's thread.
pub struct Interp {
    pub(crate) heap: Heap,
    frames: Vec<Frame>,
    current: usize,
    depth: usize,
    last: ObjId,
    empty: ObjId,
    space: ObjId,
    sep: ObjId,
    name_last: ObjId,
    name_args: ObjId,
    nums: [ObjId; SMALL_INT_CACHE],
    exts: IndexSet<String>,
    rng: SmallRng,
    limits: Limits,
    tracer: Box<dyn ExecTracer>,
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

impl Interp {
    /// Creates an interpreter with default limits and no script arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(Limits::default(), &[])
    }

    /// Creates an interpreter with explicit limits; `args` becomes the global
    /// frame's argument vector, bound under `@`, `0`, `1`, ….
    #[must_use]
    pub fn with_limits(limits: Limits, args: &[&str]) -> Self {
        Self::build(limits, args).expect("interpreter construction cannot fail")
    }

    fn build(limits: Limits, args: &[&str]) -> SzlResult<Self> {
        let mut heap = Heap::new();
        let empty = heap.new_str("");
        let space = heap.new_str(" ");
        let sep = heap.new_str(std::path::MAIN_SEPARATOR.to_string());
        let name_last = heap.new_str("_");
        let name_args = heap.new_str("@");
        let nums: [ObjId; SMALL_INT_CACHE] = std::array::from_fn(|i| heap.new_int_uncached(i as i64));
        for id in [empty, space, sep, name_last, name_args] {
            heap.set_ro(id);
        }
        for id in nums {
            heap.set_ro(id);
        }

        let global_locals = heap.new_list(Vec::new());
        let global_args = heap.new_list(Vec::new());
        let last = heap.inc_ref(empty);
        let mut interp = Self {
            heap,
            frames: vec![Frame {
                locals: global_locals,
                args: global_args,
                caller: None,
            }],
            current: 0,
            depth: 0,
            last,
            empty,
            space,
            sep,
            name_last,
            name_args,
            nums,
            exts: IndexSet::new(),
            rng: SmallRng::from_entropy(),
            limits,
            tracer: Box::new(NoopTracer),
        };

        builtins::register_all(&mut interp)?;

        for arg in args {
            let value = interp.heap.new_str(*arg);
            interp.heap.list_append(global_args, value)?;
            interp.heap.dec_ref(value);
        }
        interp.bind_args_in_frame(0)?;
        interp.set_in_frame_obj(0, name_last, empty)?;
        Ok(interp)
    }

    /// Replaces the execution tracer.
    pub fn set_tracer(&mut self, tracer: Box<dyn ExecTracer>) {
        self.tracer = tracer;
    }

    /// Heap occupancy, for leak assertions in tests.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Takes an additional reference to a value, for hosts that retain one
    /// past a handler's return.
    pub fn retain(&mut self, id: ObjId) -> ObjId {
        self.heap.inc_ref(id)
    }

    /// Releases a reference obtained from this interpreter.
    pub fn release(&mut self, id: ObjId) {
        self.heap.dec_ref(id);
    }

    /// Names of loaded extensions, in load order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.exts.iter().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // singletons and value construction
    // ------------------------------------------------------------------

    /// The shared empty-string singleton.
    #[must_use]
    pub fn empty_value(&self) -> ObjId {
        self.empty
    }

    /// The shared single-space singleton.
    #[must_use]
    pub fn space_value(&self) -> ObjId {
        self.space
    }

    /// The shared path-separator singleton.
    #[must_use]
    pub fn path_sep_value(&self) -> ObjId {
        self.sep
    }

    /// Returns an owned reference to an integer value, serving small
    /// nonnegative integers from the read-only singleton cache.
    pub fn new_int(&mut self, i: i64) -> ObjId {
        if (0..SMALL_INT_CACHE as i64).contains(&i) {
            self.heap.inc_ref(self.nums[i as usize])
        } else {
            self.heap.new_int_uncached(i)
        }
    }

    // ------------------------------------------------------------------
    // last result
    // ------------------------------------------------------------------

    /// The value most recently returned by any command.
    #[must_use]
    pub fn last(&self) -> ObjId {
        self.last
    }

    /// The last value's canonical string form.
    pub fn last_string(&mut self) -> SzlResult<String> {
        let last = self.last;
        Ok(self.heap.as_str(last)?.to_owned())
    }

    /// Sets the last value, taking a fresh reference to `id`.
    pub fn set_last(&mut self, id: ObjId) {
        self.heap.inc_ref(id);
        self.set_last_owned(id);
    }

    /// Sets the last value, consuming the caller's reference.
    pub fn set_last_owned(&mut self, id: ObjId) {
        let old = std::mem::replace(&mut self.last, id);
        self.heap.dec_ref(old);
    }

    pub fn set_last_empty(&mut self) {
        self.set_last(self.empty);
    }

    pub fn set_last_str(&mut self, s: &str) {
        let id = self.heap.new_str(s);
        self.set_last_owned(id);
    }

    pub fn set_last_int(&mut self, i: i64) {
        let id = self.new_int(i);
        self.set_last_owned(id);
    }

    pub fn set_last_float(&mut self, f: f64) {
        let id = self.heap.new_float(f);
        self.set_last_owned(id);
    }

    pub fn set_last_bool(&mut self, b: bool) {
        let id = self.heap.inc_ref(self.nums[usize::from(b)]);
        self.set_last_owned(id);
    }

    // ------------------------------------------------------------------
    // variables
    // ------------------------------------------------------------------

    /// Looks `name` up in the current frame, falling back to the global
    /// frame unless the current frame was called directly from it.
    pub(crate) fn lookup(&mut self, name: ObjId) -> SzlResult<Option<ObjId>> {
        let frame = self.frames[self.current];
        if let Some(value) = self.heap.dict_get(frame.locals, name)? {
            return Ok(Some(value));
        }
        if frame.caller != Some(0) {
            let global = self.frames[0];
            if let Some(value) = self.heap.dict_get(global.locals, name)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    pub(crate) fn lookup_name(&mut self, name: &str) -> SzlResult<Option<ObjId>> {
        if name.is_empty() {
            return Err(SzlError::new(ErrorKind::BadName, "empty obj name"));
        }
        let name_obj = self.heap.new_str(name);
        let result = self.lookup(name_obj);
        self.heap.dec_ref(name_obj);
        result
    }

    /// Resolves `name` or fails with `BadName`.
    pub fn get_var(&mut self, name: &str) -> SzlResult<ObjId> {
        self.lookup_name(name)?
            .ok_or_else(|| SzlError::bad_name(name))
    }

    pub(crate) fn set_in_frame_obj(
        &mut self,
        frame: usize,
        name: ObjId,
        value: ObjId,
    ) -> SzlResult<()> {
        let locals = self.frames[frame].locals;
        self.heap.dict_set(locals, name, value)
    }

    fn set_named_in_frame(&mut self, frame: usize, name: &str, value: ObjId) -> SzlResult<()> {
        let name_obj = self.heap.new_str(name);
        let result = self.set_in_frame_obj(frame, name_obj, value);
        self.heap.dec_ref(name_obj);
        result
    }

    /// Binds `name` in the current frame (the running command's own scope).
    pub fn set_in_current(&mut self, name: &str, value: ObjId) -> SzlResult<()> {
        self.set_named_in_frame(self.current, name, value)
    }

    /// Binds an existing name value in the current frame.
    pub(crate) fn set_in_current_obj(&mut self, name: ObjId, value: ObjId) -> SzlResult<()> {
        self.set_in_frame_obj(self.current, name, value)
    }

    /// Binds `name` in the global frame.
    pub fn set_in_global(&mut self, name: &str, value: ObjId) -> SzlResult<()> {
        self.set_named_in_frame(0, name, value)
    }

    /// Binds `name` in the caller's frame: the scope the statement that
    /// invoked the running command appears in.
    pub fn set_in_caller(&mut self, name: &str, value: ObjId) -> SzlResult<()> {
        let caller = self.frames[self.current].caller.unwrap_or(0);
        self.set_named_in_frame(caller, name, value)
    }

    /// Frame index of the running command's caller, for handlers that need
    /// to walk further (e.g. `export`).
    pub(crate) fn caller_of_current(&self) -> Option<usize> {
        self.frames[self.current].caller
    }

    pub(crate) fn caller_of(&self, frame: usize) -> Option<usize> {
        self.frames[frame].caller
    }

    pub(crate) fn set_in_frame_index(
        &mut self,
        frame: usize,
        name: &str,
        value: ObjId,
    ) -> SzlResult<()> {
        self.set_named_in_frame(frame, name, value)
    }

    /// Current nesting depth (0 at the global scope).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    // ------------------------------------------------------------------
    // frames
    // ------------------------------------------------------------------

    fn push_frame(&mut self) -> SzlResult<()> {
        let caller = self.current;
        let locals = self.heap.dict_copy(self.frames[caller].locals)?;
        let args = self.heap.new_list(Vec::new());
        self.frames.push(Frame {
            locals,
            args,
            caller: Some(caller),
        });
        self.current = self.frames.len() - 1;
        self.depth += 1;
        Ok(())
    }

    fn pop_frame(&mut self) {
        let frame = self.frames.pop().expect("frame stack underflow");
        self.current = frame.caller.expect("cannot pop the global frame");
        frame.release(&mut self.heap);
        self.depth -= 1;
    }

    fn bind_args_in_frame(&mut self, frame: usize) -> SzlResult<()> {
        let args = self.frames[frame].args;
        let name_args = self.name_args;
        self.set_in_frame_obj(frame, name_args, args)?;
        let items: ArgVec = SmallVec::from_slice(self.heap.as_list(args)?);
        for (i, &arg) in items.iter().enumerate() {
            let name = self.new_int(i as i64);
            let result = self.set_in_frame_obj(frame, name, arg);
            self.heap.dec_ref(name);
            result?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // evaluation
    // ------------------------------------------------------------------

    /// Evaluates a single token value: brace groups strip one level, bracket
    /// groups execute as a statement, quoted strings strip their quotes,
    /// `$name` resolves a variable, anything else is a literal. The result
    /// lands in `last`.
    pub(crate) fn eval_obj(&mut self, token: ObjId) -> SzlResult {
        self.set_last_empty();
        let s = self.heap.as_str(token)?.to_owned();
        let trimmed = parse::trim(&s);
        if trimmed.is_empty() {
            return Ok(Flow::Ok);
        }
        let bytes = trimmed.as_bytes();
        let (first, last_byte) = (bytes[0], bytes[bytes.len() - 1]);
        if trimmed.len() >= 2 && first == b'{' && last_byte == b'}' {
            self.set_last_str(&trimmed[1..trimmed.len() - 1]);
            Ok(Flow::Ok)
        } else if trimmed.len() >= 2 && first == b'[' && last_byte == b']' {
            let stmt = self.heap.new_str(&trimmed[1..trimmed.len() - 1]);
            let result = self.run_statement(stmt);
            self.heap.dec_ref(stmt);
            result
        } else if trimmed.len() >= 2 && first == b'"' && last_byte == b'"' {
            self.set_last_str(&trimmed[1..trimmed.len() - 1]);
            Ok(Flow::Ok)
        } else if first == b'$' {
            let mut name = &trimmed[1..];
            if name.len() >= 2 && name.starts_with('{') && name.ends_with('}') {
                name = &name[1..name.len() - 1];
            }
            match self.lookup_name(name)? {
                Some(value) => {
                    self.set_last(value);
                    Ok(Flow::Ok)
                }
                None => Err(SzlError::bad_name(name)),
            }
        } else {
            if trimmed.len() == s.len() {
                self.set_last(token);
            } else {
                self.set_last_str(trimmed);
            }
            Ok(Flow::Ok)
        }
    }

    /// Executes one statement value in a fresh frame.
    pub(crate) fn run_statement(&mut self, stmt: ObjId) -> SzlResult {
        self.set_last_empty();
        if self.depth >= self.limits.max_nesting {
            return Err(SzlError::nesting_limit());
        }
        let tokens: ArgVec = SmallVec::from_slice(self.heap.as_list(stmt)?);
        if tokens.is_empty() {
            return Ok(Flow::Ok);
        }
        if self.tracer.wants_statements() {
            let text = self.heap.as_str(stmt)?.to_owned();
            let depth = self.depth;
            self.tracer.on_statement(depth, &text);
        }
        // Statement tokens stay alive independently of `stmt`, which script
        // code may mutate while this statement runs.
        for &token in &tokens {
            self.heap.inc_ref(token);
        }
        self.push_frame()?;
        let result = self.statement_in_frame(&tokens);
        self.pop_frame();
        for &token in &tokens {
            self.heap.dec_ref(token);
        }
        result
    }

    fn statement_in_frame(&mut self, tokens: &[ObjId]) -> SzlResult {
        let args = self.frames[self.current].args;
        for &token in tokens {
            let flow = self.eval_obj(token)?;
            if flow != Flow::Ok {
                return Ok(flow);
            }
            let value = self.last;
            self.heap.list_append(args, value)?;
        }

        let mut argv: ArgVec = SmallVec::from_slice(self.heap.as_list(args)?);
        let head = argv[0];
        if !self.heap.get(head).is_callable() {
            let name = self.heap.as_str(head)?.to_owned();
            let resolved = self.lookup_name(&name).ok().flatten();
            match resolved {
                Some(value) if self.heap.get(value).is_callable() => {
                    // Swap the resolved command in so the handler and the
                    // `0` binding both see the command object.
                    self.heap.list_set(args, 0, value)?;
                    argv[0] = value;
                }
                _ => return Err(SzlError::not_a_proc(&name)),
            }
        }

        let (min_args, max_args, handler) = {
            let cmd = self
                .heap
                .get(argv[0])
                .cmd
                .as_ref()
                .expect("head checked callable");
            (cmd.min_args, cmd.max_args, cmd.handler)
        };
        if min_args.is_some_and(|min| argv.len() < min)
            || max_args.is_some_and(|max| argv.len() > max)
        {
            return Err(self.usage_error(argv[0]));
        }

        self.bind_args_in_frame(self.current)?;

        // The last value was clobbered during argument evaluation.
        self.set_last_empty();
        let result = handler(self, &argv);
        if let Err(err) = &result {
            let message = err.message().to_owned();
            self.set_last_str(&message);
        }

        // The result, success or diagnostic, becomes `_` in the caller.
        let caller = self.frames[self.current].caller.unwrap_or(0);
        let name_last = self.name_last;
        let last = self.last;
        self.set_in_frame_obj(caller, name_last, last)?;
        result
    }

    /// Builds the formatted `Usage` error for a command object.
    pub(crate) fn usage_error(&mut self, cmd: ObjId) -> SzlError {
        let name = self
            .heap
            .as_str(cmd)
            .map(str::to_owned)
            .unwrap_or_else(|_| "?".to_owned());
        let help = self
            .heap
            .get(cmd)
            .cmd
            .as_ref()
            .and_then(|command| command.help);
        let message = match help {
            Some(help) => format!("bad usage, should be '{name} {help}'"),
            None => format!("bad usage, should be '{name}'"),
        };
        SzlError::new(ErrorKind::Usage, message)
    }

    /// Executes a value as a script: every statement in order, stopping at
    /// the first non-`Ok` flow.
    pub(crate) fn run_obj(&mut self, script: ObjId) -> SzlResult {
        let statements = self.heap.as_code_vec(script)?;
        for &stmt in &statements {
            self.heap.inc_ref(stmt);
        }
        self.set_last_empty();
        let mut outcome = Ok(Flow::Ok);
        for &stmt in &statements {
            match self.run_statement(stmt) {
                Ok(Flow::Ok) => {}
                other => {
                    outcome = other;
                    break;
                }
            }
        }
        for &stmt in &statements {
            self.heap.dec_ref(stmt);
        }
        outcome
    }

    fn finish(&mut self, result: SzlResult) -> Status {
        match result {
            Ok(flow) => flow.into(),
            Err(err) => {
                let message = err.message().to_owned();
                self.set_last_str(&message);
                Status::Error
            }
        }
    }

    /// Runs a script from source text. The final status and `last` value are
    /// those of the last statement executed.
    pub fn run(&mut self, code: &str) -> Status {
        let obj = self.heap.new_str(code);
        let result = self.run_obj(obj);
        self.heap.dec_ref(obj);
        self.finish(result)
    }

    /// Evaluates a single expression (one token).
    pub fn eval(&mut self, expression: &str) -> Status {
        let obj = self.heap.new_str(expression);
        let result = self.eval_obj(obj);
        self.heap.dec_ref(obj);
        self.finish(result)
    }

    /// Reads and runs a script file in the global scope.
    pub fn source(&mut self, path: &std::path::Path) -> Status {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                self.set_last_str(&format!("failed to read {}: {err}", path.display()));
                return Status::Error;
            }
        };
        let saved = self.current;
        self.current = 0;
        let status = self.run(&text);
        self.current = saved;
        status
    }

    // ------------------------------------------------------------------
    // registration
    // ------------------------------------------------------------------

    /// Creates a callable value and, when `name` is non-empty, binds it in
    /// the global frame. Returns an owned reference to the command object.
    pub fn register_command(
        &mut self,
        name: &str,
        min_args: Option<usize>,
        max_args: Option<usize>,
        help: Option<&'static str>,
        handler: Handler,
        data: CmdData,
    ) -> SzlResult<ObjId> {
        let printable = if name.is_empty() {
            self.unique_name("proc")
        } else {
            name.to_owned()
        };
        let id = self.heap.allocate(Obj::new_str(printable));
        self.heap.get_mut(id).cmd = Some(Box::new(Command {
            handler,
            min_args,
            max_args,
            help,
            data,
        }));
        if !name.is_empty() {
            self.set_named_in_frame(0, name, id)?;
        }
        Ok(id)
    }

    /// Binds a read-only value in the global frame.
    pub fn register_constant(&mut self, name: &str, value: ObjId) -> SzlResult<()> {
        self.heap.set_ro(value);
        self.set_in_global(name, value)
    }

    /// Atomically installs a named bundle of commands and constants.
    /// Registering the same extension name twice is a no-op.
    pub fn register_extension(&mut self, name: &str, exports: &[ExtExport]) -> SzlResult<()> {
        if self.exts.contains(name) {
            return Ok(());
        }
        for export in exports {
            match *export {
                ExtExport::Proc {
                    name,
                    min_args,
                    max_args,
                    help,
                    handler,
                } => {
                    let id =
                        self.register_command(name, min_args, max_args, help, handler, CmdData::None)?;
                    self.heap.dec_ref(id);
                }
                ExtExport::ConstStr { name, value } => {
                    let id = self.heap.new_str(value);
                    self.register_constant(name, id)?;
                    self.heap.dec_ref(id);
                }
                ExtExport::ConstInt { name, value } => {
                    let id = self.new_int(value);
                    self.register_constant(name, id)?;
                    self.heap.dec_ref(id);
                }
                ExtExport::ConstFloat { name, value } => {
                    let id = self.heap.new_float(value);
                    self.register_constant(name, id)?;
                    self.heap.dec_ref(id);
                }
            }
        }
        self.exts.insert(name.to_owned());
        Ok(())
    }

    /// Generates a unique object name with the given prefix.
    pub(crate) fn unique_name(&mut self, prefix: &str) -> String {
        let tag: u32 = self.rng.gen();
        format!("{prefix}:{tag:08x}")
    }
}
