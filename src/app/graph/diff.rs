use std::collections::{HashMap, HashSet};

/// A bound visual. `refresh` receives the freshly built value for a key that
/// survived the join and copies over whatever it treats as cosmetic.
pub(in crate::app) trait Visual {
    fn refresh(&mut self, next: Self);
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct JoinOps {
    pub(in crate::app) enter: Vec<String>,
    pub(in crate::app) update: Vec<String>,
    pub(in crate::app) exit: Vec<String>,
}

struct Bound<V> {
    visual: V,
    entered_at: f64,
}

pub(in crate::app) struct Exiting<V> {
    pub(in crate::app) key: String,
    pub(in crate::app) visual: V,
    started_at: f64,
}

fn progress(started_at: f64, duration: f64, now: f64) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    ((now - started_at) / duration).clamp(0.0, 1.0) as f32
}

/// Keyed enter/update/exit reconciliation with timed transitions.
///
/// Live visuals are addressed by key. On exit a visual moves to a separate list,
/// frozen as it was, and stays there until its exit transition has run; it can't be
/// looked up or refreshed any more, so a key that comes back gets a new visual.
pub(in crate::app) struct KeyedBinder<V> {
    live: HashMap<String, Bound<V>>,
    order: Vec<String>,
    exiting: Vec<Exiting<V>>,
    enter_duration: f64,
    exit_duration: f64,
}

impl<V: Visual> KeyedBinder<V> {
    pub(in crate::app) fn new(enter_duration: f64, exit_duration: f64) -> Self {
        Self {
            live: HashMap::new(),
            order: Vec::new(),
            exiting: Vec::new(),
            enter_duration,
            exit_duration,
        }
    }

    /// Reconciles the bound set against `items`. The first occurrence of a repeated
    /// key wins.
    pub(in crate::app) fn join<I>(&mut self, items: I, now: f64) -> JoinOps
    where
        I: IntoIterator<Item = (String, V)>,
    {
        let mut ops = JoinOps::default();
        let mut seen = HashSet::new();
        let mut next_order = Vec::new();

        for (key, visual) in items {
            if !seen.insert(key.clone()) {
                continue;
            }

            if let Some(bound) = self.live.get_mut(&key) {
                bound.visual.refresh(visual);
                ops.update.push(key.clone());
            } else {
                self.live.insert(
                    key.clone(),
                    Bound {
                        visual,
                        entered_at: now,
                    },
                );
                ops.enter.push(key.clone());
            }
            next_order.push(key);
        }

        for key in std::mem::replace(&mut self.order, next_order) {
            if seen.contains(&key) {
                continue;
            }
            if let Some(bound) = self.live.remove(&key) {
                self.exiting.push(Exiting {
                    key: key.clone(),
                    visual: bound.visual,
                    started_at: now,
                });
                ops.exit.push(key);
            }
        }

        ops
    }

    /// Detaches exiting visuals whose transition has finished and returns their keys.
    pub(in crate::app) fn retire(&mut self, now: f64) -> Vec<String> {
        let exit_duration = self.exit_duration;
        let mut retired = Vec::new();
        self.exiting.retain(|exiting| {
            let done = progress(exiting.started_at, exit_duration, now) >= 1.0;
            if done {
                retired.push(exiting.key.clone());
            }
            !done
        });
        retired
    }

    pub(in crate::app) fn get(&self, key: &str) -> Option<&V> {
        self.live.get(key).map(|bound| &bound.visual)
    }

    pub(in crate::app) fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.live.get_mut(key).map(|bound| &mut bound.visual)
    }

    pub(in crate::app) fn len(&self) -> usize {
        self.live.len()
    }

    /// Live visuals in join order with their enter progress in `[0, 1]`.
    pub(in crate::app) fn live(&self, now: f64) -> impl Iterator<Item = (&str, &V, f32)> {
        self.order.iter().filter_map(move |key| {
            self.live.get(key).map(|bound| {
                (
                    key.as_str(),
                    &bound.visual,
                    progress(bound.entered_at, self.enter_duration, now),
                )
            })
        })
    }

    /// Exiting visuals with their remaining scale, `1` at exit start down to `0`.
    pub(in crate::app) fn exiting(&self, now: f64) -> impl Iterator<Item = (&Exiting<V>, f32)> {
        self.exiting.iter().map(move |exiting| {
            (
                exiting,
                1.0 - progress(exiting.started_at, self.exit_duration, now),
            )
        })
    }

    pub(in crate::app) fn is_animating(&self, now: f64) -> bool {
        !self.exiting.is_empty()
            || self
                .live
                .values()
                .any(|bound| progress(bound.entered_at, self.enter_duration, now) < 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Dot {
        color: &'static str,
        moved: u32,
    }

    impl Visual for Dot {
        fn refresh(&mut self, next: Self) {
            self.color = next.color;
        }
    }

    fn dots(keys: &[&str], color: &'static str) -> Vec<(String, Dot)> {
        keys.iter()
            .map(|key| (key.to_string(), Dot { color, moved: 0 }))
            .collect()
    }

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[test]
    fn test_join_splits_enter_update_exit() {
        let mut binder = KeyedBinder::new(1.5, 0.75);
        let first = binder.join(dots(&["a", "b"], "grey"), 0.0);
        assert_eq!(sorted(first.enter), vec!["a", "b"]);
        assert!(first.update.is_empty() && first.exit.is_empty());

        let second = binder.join(dots(&["b", "c"], "black"), 1.0);
        assert_eq!(second.enter, vec!["c"]);
        assert_eq!(second.update, vec!["b"]);
        assert_eq!(second.exit, vec!["a"]);
    }

    #[test]
    fn test_update_keeps_the_bound_visual() {
        let mut binder = KeyedBinder::new(0.0, 0.0);
        binder.join(dots(&["a"], "grey"), 0.0);
        if let Some(dot) = binder.get_mut("a") {
            dot.moved = 7;
        }

        binder.join(dots(&["a"], "black"), 1.0);
        assert_eq!(
            binder.get("a"),
            Some(&Dot {
                color: "black",
                moved: 7
            })
        );
    }

    #[test]
    fn test_exit_happens_once_and_retires_after_transition() {
        let mut binder = KeyedBinder::new(0.0, 0.75);
        binder.join(dots(&["a"], "grey"), 0.0);
        assert_eq!(binder.join(Vec::new(), 1.0).exit, vec!["a"]);
        assert!(binder.join(Vec::new(), 1.2).exit.is_empty());
        assert!(binder.get_mut("a").is_none());

        assert!(binder.retire(1.5).is_empty());
        assert!(binder.is_animating(1.5));
        let scales = binder
            .exiting(1.375)
            .map(|(_, scale)| scale)
            .collect::<Vec<_>>();
        assert_eq!(scales, vec![0.5]);

        assert_eq!(binder.retire(1.75), vec!["a"]);
        assert!(binder.retire(3.0).is_empty());
        assert!(!binder.is_animating(3.0));
    }

    #[test]
    fn test_reentering_key_gets_a_fresh_visual() {
        let mut binder = KeyedBinder::new(1.0, 1.0);
        binder.join(dots(&["a"], "grey"), 0.0);
        binder.join(Vec::new(), 2.0);
        let ops = binder.join(dots(&["a"], "black"), 2.5);

        assert_eq!(ops.enter, vec!["a"]);
        assert_eq!(binder.exiting(2.5).count(), 1);
        let live = binder
            .live(2.5)
            .map(|(key, _, t)| (key.to_string(), t))
            .collect::<Vec<_>>();
        assert_eq!(live, vec![("a".to_string(), 0.0)]);
    }

    #[test]
    fn test_duplicate_keys_keep_first_occurrence() {
        let mut binder = KeyedBinder::new(0.0, 0.0);
        let mut items = dots(&["a"], "grey");
        items.extend(dots(&["a"], "black"));
        let ops = binder.join(items, 0.0);

        assert_eq!(ops.enter, vec!["a"]);
        assert_eq!(binder.len(), 1);
        assert_eq!(binder.get("a").map(|dot| dot.color), Some("grey"));
    }

    #[test]
    fn test_zero_duration_exit_retires_immediately() {
        let mut binder = KeyedBinder::new(0.0, 0.0);
        binder.join(dots(&["a→b"], "grey"), 0.0);
        binder.join(Vec::new(), 0.1);
        assert_eq!(binder.retire(0.1), vec!["a→b"]);
    }
}
