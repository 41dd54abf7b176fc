//! Integration tests for event routing.
//!
//! A controller builds a small region tree and logs which regions each
//! traversal considered relevant; targeting, event mutation, and aborting
//! are all observed from the outside through [`System::dispatch`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use reflow_core::context::Context;
use reflow_core::error::Result;
use reflow_core::flow::{abort_traversal, region, RoutingRegion};
use reflow_core::system::System;

type RegionMap = Rc<RefCell<HashMap<&'static str, RoutingRegion>>>;
type VisitLog = Rc<RefCell<Vec<(&'static str, bool)>>>;

/// Remembers the active region under `name`, so tests can target it later.
fn remember(ctx: &mut Context, regions: &RegionMap, name: &'static str) -> Result<()> {
    if let Some(active) = ctx.active_region()? {
        regions.borrow_mut().insert(name, active);
    }
    Ok(())
}

/// A two-branch tree: region "a" holds leaves "a1" and "a2", region "b"
/// holds leaf "b1". Every visit is logged with its relevance, and `on_leaf`
/// runs inside each leaf.
fn describe_with<F>(
    ctx: &mut Context,
    regions: &RegionMap,
    log: &VisitLog,
    on_leaf: &mut F,
) -> Result<()>
where
    F: FnMut(&mut Context, &'static str, bool) -> Result<()>,
{
    region(ctx, |ctx, relevant| {
        log.borrow_mut().push(("a", relevant));
        remember(ctx, regions, "a")?;
        for leaf in ["a1", "a2"] {
            region(ctx, |ctx, relevant| {
                log.borrow_mut().push((leaf, relevant));
                remember(ctx, regions, leaf)?;
                on_leaf(ctx, leaf, relevant)
            })?;
        }
        Ok(())
    })?;
    region(ctx, |ctx, relevant| {
        log.borrow_mut().push(("b", relevant));
        remember(ctx, regions, "b")?;
        region(ctx, |ctx, relevant| {
            log.borrow_mut().push(("b1", relevant));
            remember(ctx, regions, "b1")?;
            on_leaf(ctx, "b1", relevant)
        })
    })?;
    Ok(())
}

fn describe(ctx: &mut Context, regions: &RegionMap, log: &VisitLog) -> Result<()> {
    describe_with(ctx, regions, log, &mut |_, _, _| Ok(()))
}

/// A targeted dispatch flags exactly the root-to-target path as relevant;
/// siblings and the other branch stay irrelevant.
#[test]
fn targeted_dispatch_marks_exactly_the_path() {
    struct Click;

    let mut system = System::new();
    let regions: RegionMap = Rc::new(RefCell::new(HashMap::new()));
    let log: VisitLog = Rc::new(RefCell::new(Vec::new()));

    system.refresh(|ctx| describe(ctx, &regions, &log)).unwrap();
    assert!(log.borrow().iter().all(|(_, relevant)| *relevant));

    let target = regions.borrow()["a2"].clone();
    log.borrow_mut().clear();
    system
        .dispatch(&target, Click, |ctx| describe(ctx, &regions, &log))
        .unwrap();

    let relevance: HashMap<&str, bool> = log.borrow().iter().copied().collect();
    assert!(relevance["a"]);
    assert!(relevance["a2"]);
    assert!(!relevance["a1"]);
    assert!(!relevance["b"]);
    assert!(!relevance["b1"]);
}

/// Handlers write into the event through the context, and the dispatcher
/// reads the mutation off the returned event.
#[test]
fn dispatch_hands_the_mutated_event_back() {
    #[derive(Debug, PartialEq)]
    struct Toggle {
        applied: bool,
    }

    let mut system = System::new();
    let regions: RegionMap = Rc::new(RefCell::new(HashMap::new()));
    let log: VisitLog = Rc::new(RefCell::new(Vec::new()));

    system.refresh(|ctx| describe(ctx, &regions, &log)).unwrap();

    let target = regions.borrow()["b1"].clone();
    let toggled = system
        .dispatch(&target, Toggle { applied: false }, |ctx| {
            describe_with(ctx, &regions, &log, &mut |ctx, _leaf, relevant| {
                if relevant {
                    ctx.with_event::<Toggle, _>(|_ctx, toggle| {
                        toggle.applied = true;
                    })?;
                }
                Ok(())
            })
        })
        .unwrap();

    assert!(toggled.applied);
}

/// Aborting ends the traversal where it stands: nothing after the handling
/// region runs, and the dispatch still reports success.
#[test]
fn abort_skips_the_rest_of_the_traversal() {
    struct Nudge;

    let mut system = System::new();
    let regions: RegionMap = Rc::new(RefCell::new(HashMap::new()));
    let log: VisitLog = Rc::new(RefCell::new(Vec::new()));

    system.refresh(|ctx| describe(ctx, &regions, &log)).unwrap();

    let target = regions.borrow()["a1"].clone();
    log.borrow_mut().clear();
    system
        .dispatch(&target, Nudge, |ctx| {
            describe_with(ctx, &regions, &log, &mut |_ctx, leaf, relevant| {
                if relevant && leaf == "a1" {
                    return abort_traversal();
                }
                Ok(())
            })
        })
        .unwrap();

    let visited: Vec<&str> = log.borrow().iter().map(|(name, _)| *name).collect();
    assert_eq!(visited, vec!["a", "a1"]);
}

/// A broadcast visits every region as relevant.
#[test]
fn broadcast_reaches_every_region() {
    struct Tick;

    let mut system = System::new();
    let regions: RegionMap = Rc::new(RefCell::new(HashMap::new()));
    let log: VisitLog = Rc::new(RefCell::new(Vec::new()));

    system.refresh(|ctx| describe(ctx, &regions, &log)).unwrap();

    log.borrow_mut().clear();
    system
        .broadcast(Tick, |ctx| describe(ctx, &regions, &log))
        .unwrap();

    assert_eq!(log.borrow().len(), 5);
    assert!(log.borrow().iter().all(|(_, relevant)| *relevant));
}

/// The handle captured at a call site names the same region on every
/// traversal, which is what makes storing targets across frames sound.
#[test]
fn region_identity_is_stable_across_refreshes() {
    let mut system = System::new();
    let regions: RegionMap = Rc::new(RefCell::new(HashMap::new()));
    let log: VisitLog = Rc::new(RefCell::new(Vec::new()));

    system.refresh(|ctx| describe(ctx, &regions, &log)).unwrap();
    let first = regions.borrow()["a1"].clone();

    system.refresh(|ctx| describe(ctx, &regions, &log)).unwrap();
    let second = regions.borrow()["a1"].clone();

    assert_eq!(first, second);
}
