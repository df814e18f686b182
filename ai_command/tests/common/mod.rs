#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use ai_command::{
    Agent, Command, CommandClass, CommandContext, Controller, ControllerConfig, Flow,
    HostBehavior, HostContext, LatentId, MemorySink, PushPolicy, StateName, Status, BEGIN_LABEL,
};

pub struct Alpha;
pub struct Beta;
pub struct Gamma;

#[derive(Debug, Clone)]
pub struct TestPawn {
    pub clock: f64,
    pub alive: bool,
}

impl Default for TestPawn {
    fn default() -> Self {
        Self {
            clock: 0.0,
            alive: true,
        }
    }
}

impl Agent for TestPawn {
    fn world_time(&self) -> f64 {
        self.clock
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Shared hook log.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Entries without `step(..)` lines.
    pub fn hooks(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|entry| !entry.starts_with("step("))
            .cloned()
            .collect()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.borrow().iter().any(|recorded| recorded == entry)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub type MakeCommand = fn(&Journal) -> Box<dyn Command<TestPawn>>;

pub enum Step {
    /// Fall through.
    Idle,
    /// End of state code.
    Halt,
    Sleep(f32),
    /// Custom latent action completed on its first poll.
    Latent(LatentId),
    Finish(Status),
    Push(MakeCommand),
    Goto(&'static str),
}

/// Scriptable command whose class is `Probe<K>`.
pub struct Probe<K> {
    pub name: &'static str,
    journal: Journal,
    policy: PushPolicy,
    script: Vec<Step>,
    ignore_notifications: bool,
    _class: PhantomData<fn() -> K>,
}

impl<K: 'static> Probe<K> {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            policy: PushPolicy::default(),
            script: Vec::new(),
            ignore_notifications: false,
            _class: PhantomData,
        }
    }

    pub fn script(mut self, script: Vec<Step>) -> Self {
        self.script = script;
        self
    }

    pub fn policy(mut self, policy: PushPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ignoring_notifications(mut self) -> Self {
        self.ignore_notifications = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Command<TestPawn>> {
        Box::new(self)
    }

    pub fn class() -> CommandClass {
        CommandClass::of::<Probe<K>>()
    }
}

impl<K: 'static> Command<TestPawn> for Probe<K> {
    fn push_policy(&self) -> PushPolicy {
        self.policy
    }

    fn auto_state(&self) -> Option<StateName> {
        Some("Run")
    }

    fn pre_push(&mut self, _ctx: &mut CommandContext<'_, TestPawn>) {
        self.journal.record(format!("pre_push({})", self.name));
    }

    fn pushed(&mut self, ctx: &mut CommandContext<'_, TestPawn>) {
        self.journal.record(format!("pushed({})", self.name));
        if self.ignore_notifications {
            ctx.set_ignore_notifications(true);
        }
    }

    fn paused(&mut self, child: CommandClass, _ctx: &mut CommandContext<'_, TestPawn>) {
        self.journal
            .record(format!("paused({}, {child})", self.name));
    }

    fn internal_tick(&mut self, _delta_seconds: f32, _ctx: &mut CommandContext<'_, TestPawn>) {
        self.journal.record(format!("internal_tick({})", self.name));
    }

    fn resumed(
        &mut self,
        child: CommandClass,
        child_status: Status,
        _ctx: &mut CommandContext<'_, TestPawn>,
    ) {
        self.journal
            .record(format!("resumed({}, {child}, {child_status:?})", self.name));
    }

    fn popped(&mut self, _ctx: &mut CommandContext<'_, TestPawn>) {
        self.journal.record(format!("popped({})", self.name));
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_, TestPawn>) -> Flow {
        self.journal.record(format!("step({})", self.name));
        let offset = ctx.cursor().map_or(0, |cursor| cursor.offset) as usize;
        match self.script.get(offset) {
            None | Some(Step::Halt) => Flow::Stop,
            Some(Step::Idle) => Flow::Next,
            Some(Step::Sleep(seconds)) => {
                ctx.sleep(*seconds);
                Flow::Next
            }
            Some(Step::Latent(latent)) => {
                ctx.begin_latent(*latent);
                Flow::Next
            }
            Some(Step::Finish(status)) => {
                ctx.finish(*status);
                Flow::Stop
            }
            Some(Step::Push(make)) => {
                ctx.push_child(make(&self.journal));
                Flow::Next
            }
            Some(Step::Goto(state)) => {
                ctx.goto_state(state);
                Flow::Next
            }
        }
    }

    fn poll_latent(
        &mut self,
        latent: LatentId,
        _delta_seconds: f32,
        ctx: &mut CommandContext<'_, TestPawn>,
    ) {
        self.journal.record(format!("poll({}, {latent})", self.name));
        ctx.finish_latent();
    }

    fn dump_string(&self) -> String {
        format!("probe {}", self.name)
    }
}

/// Stacks another link from its `pushed` hook until `remaining` reaches one.
pub struct Link {
    pub remaining: u32,
}

impl Command<TestPawn> for Link {
    fn push_policy(&self) -> PushPolicy {
        PushPolicy::allow()
    }

    fn pushed(&mut self, ctx: &mut CommandContext<'_, TestPawn>) {
        if self.remaining > 1 {
            ctx.push_child(Box::new(Link {
                remaining: self.remaining - 1,
            }));
        }
    }
}

/// Default behaviour that counts its own instructions. When `spawn` is
/// non-zero it pushes a `Link` chain that long at the top of its loop.
pub struct CountingBehavior {
    pub steps: Rc<Cell<u32>>,
    pub spawn: Rc<Cell<u32>>,
}

impl HostBehavior<TestPawn> for CountingBehavior {
    fn states(&self) -> &'static [StateName] {
        &["Idle", "Alert"]
    }

    fn auto_state(&self) -> Option<StateName> {
        Some("Idle")
    }

    fn execute(&mut self, ctx: &mut HostContext<'_, TestPawn>) -> Flow {
        self.steps.set(self.steps.get() + 1);
        match ctx.cursor().map(|cursor| cursor.offset) {
            Some(0) => {
                let links = self.spawn.replace(0);
                if links > 0 {
                    ctx.push_command(Box::new(Link { remaining: links }));
                }
                ctx.sleep(0.05);
                Flow::Next
            }
            _ => {
                ctx.goto_label(BEGIN_LABEL);
                Flow::Next
            }
        }
    }
}

pub struct Harness {
    pub controller: Controller<TestPawn>,
    pub sink: Rc<MemorySink>,
    pub host_steps: Rc<Cell<u32>>,
    /// Length of the `Link` chain the default behaviour pushes next.
    pub host_spawn: Rc<Cell<u32>>,
    pub journal: Journal,
}

pub fn harness(config: ControllerConfig) -> Harness {
    let sink = Rc::new(MemorySink::new());
    let host_steps = Rc::new(Cell::new(0));
    let host_spawn = Rc::new(Cell::new(0));
    let controller = Controller::new(config)
        .with_sink(sink.clone())
        .with_behavior(Box::new(CountingBehavior {
            steps: host_steps.clone(),
            spawn: host_spawn.clone(),
        }))
        .with_pawn(TestPawn::default());
    Harness {
        controller,
        sink,
        host_steps,
        host_spawn,
        journal: Journal::default(),
    }
}

pub fn default_harness() -> Harness {
    harness(ControllerConfig::default())
}
