//! Keyed scenes and the animated transitions between them.
//!
//! Nodes are matched across commits by [`LayoutKey`], never by position in
//! the packed output.

use crate::config::ViewConfig;
use crate::layout::LayoutKey;
use crate::models::TreeNode;
use crate::pack::{PackedCircle, Packer};
use std::collections::HashMap;

/// Radius used for circles that are entering or leaving.
pub const VANISHING_RADIUS: f64 = 1e-6;

const VANISHING_OPACITY: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Geometry {
    fn collapsed_at(other: Geometry) -> Self {
        Self {
            x: other.x,
            y: other.y,
            r: VANISHING_RADIUS,
        }
    }

    fn lerp(self, to: Geometry, t: f64) -> Self {
        Self {
            x: lerp(self.x, to.x, t),
            y: lerp(self.y, to.y, t),
            r: lerp(self.r, to.r, t),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub key: LayoutKey,
    pub name: String,
    pub is_leaf: bool,
    pub value: u64,
    pub geometry: Geometry,
    /// Present only for leaves large enough to carry text.
    pub label: Option<String>,
}

/// The packed geometry of one commit, indexed by layout key.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    index: HashMap<LayoutKey, usize>,
}

impl Scene {
    pub fn build(tree: &TreeNode, packer: &dyn Packer, config: &ViewConfig) -> Self {
        let circles = packer.pack(tree, config.pack_width(), config.pack_height());
        Self::from_packed(circles, config)
    }

    pub fn from_packed(circles: Vec<PackedCircle>, config: &ViewConfig) -> Self {
        let nodes = circles
            .into_iter()
            .map(|circle| {
                let label = if circle.is_leaf && circle.r > config.label_min_radius {
                    Some(truncate_label(
                        &circle.name,
                        circle.r * config.label_chars_per_radius,
                    ))
                } else {
                    None
                };
                SceneNode {
                    key: circle.key,
                    name: circle.name,
                    is_leaf: circle.is_leaf,
                    value: circle.value,
                    geometry: Geometry {
                        x: circle.x,
                        y: circle.y,
                        r: circle.r,
                    },
                    label,
                }
            })
            .collect();
        Self::from_nodes(nodes)
    }

    fn from_nodes(nodes: Vec<SceneNode>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.key.clone(), i))
            .collect();
        Self { nodes, index }
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn get(&self, key: &LayoutKey) -> Option<&SceneNode> {
        self.index.get(key).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, key: &LayoutKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn root(&self) -> Option<&SceneNode> {
        self.nodes.first()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn nearest_ancestor(&self, key: &LayoutKey) -> Option<&SceneNode> {
        key.ancestors().find_map(|ancestor| self.get(&ancestor))
    }

    /// A settled rendering of this scene.
    pub fn frame(&self) -> Frame {
        Transition::between(self, self).sample(1.0)
    }
}

/// Shorten `text` to at most `max_len` characters, ending in `...` when cut.
pub fn truncate_label(text: &str, max_len: f64) -> String {
    let len = text.chars().count();
    if len as f64 <= max_len {
        return text.to_string();
    }
    let keep = (max_len - 3.0).max(0.0) as usize;
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Enter,
    Update,
    Exit,
}

#[derive(Debug, Clone)]
struct Tween {
    node: SceneNode,
    from: Geometry,
    to: Geometry,
    phase: Phase,
}

#[derive(Debug, Clone)]
struct LabelTween {
    key: LayoutKey,
    text: String,
    from: (f64, f64, f64),
    to: (f64, f64, f64),
    phase: Phase,
}

/// Interpolation from one scene to the next.
#[derive(Debug, Clone)]
pub struct Transition {
    tweens: Vec<Tween>,
    labels: Vec<LabelTween>,
}

impl Transition {
    pub fn between(previous: &Scene, next: &Scene) -> Self {
        let mut tweens = Vec::with_capacity(previous.len().max(next.len()));
        let mut labels = Vec::new();

        // Leaving nodes collapse into whatever still encloses them.
        for node in previous.nodes() {
            if next.contains(&node.key) {
                continue;
            }
            let target = next
                .nearest_ancestor(&node.key)
                .map(|a| Geometry::collapsed_at(a.geometry))
                .unwrap_or_else(|| Geometry::collapsed_at(node.geometry));
            tweens.push(Tween {
                node: node.clone(),
                from: node.geometry,
                to: target,
                phase: Phase::Exit,
            });
            if let Some(text) = &node.label {
                labels.push(LabelTween {
                    key: node.key.clone(),
                    text: text.clone(),
                    from: (node.geometry.x, node.geometry.y, 1.0),
                    to: (target.x, target.y, VANISHING_OPACITY),
                    phase: Phase::Exit,
                });
            }
        }

        for node in next.nodes() {
            let (from, phase) = match previous.get(&node.key) {
                Some(old) => (old.geometry, Phase::Update),
                None => {
                    let origin = previous
                        .nearest_ancestor(&node.key)
                        .or_else(|| next.nearest_ancestor(&node.key))
                        .map(|a| a.geometry)
                        .unwrap_or(node.geometry);
                    (Geometry::collapsed_at(origin), Phase::Enter)
                }
            };
            tweens.push(Tween {
                node: node.clone(),
                from,
                to: node.geometry,
                phase,
            });

            if let Some(text) = &node.label {
                let to = (node.geometry.x, node.geometry.y, 1.0);
                let had_label = previous
                    .get(&node.key)
                    .filter(|old| old.label.is_some());
                let (from, phase) = match had_label {
                    Some(old) => ((old.geometry.x, old.geometry.y, 1.0), Phase::Update),
                    None => {
                        let origin = next
                            .nearest_ancestor(&node.key)
                            .map(|a| a.geometry)
                            .unwrap_or(node.geometry);
                        ((origin.x, origin.y, VANISHING_OPACITY), Phase::Enter)
                    }
                };
                labels.push(LabelTween {
                    key: node.key.clone(),
                    text: text.clone(),
                    from,
                    to,
                    phase,
                });
            }
        }

        Self { tweens, labels }
    }

    /// The frame at progress `t` in `[0, 1]`, eased.
    ///
    /// At `t = 1` leaving nodes are gone.
    pub fn sample(&self, t: f64) -> Frame {
        let t = t.clamp(0.0, 1.0);
        let e = ease_cubic_in_out(t);
        let done = t >= 1.0;

        let circles = self
            .tweens
            .iter()
            .filter(|tween| !(done && tween.phase == Phase::Exit))
            .map(|tween| {
                let g = tween.from.lerp(tween.to, e);
                FrameCircle {
                    key: tween.node.key.clone(),
                    is_leaf: tween.node.is_leaf,
                    x: g.x,
                    y: g.y,
                    r: g.r,
                    title: format!(
                        "{}\n{} bytes",
                        tween.node.key.display_path(),
                        group_thousands(tween.node.value)
                    ),
                    phase: tween.phase,
                }
            })
            .collect();

        let labels = self
            .labels
            .iter()
            .filter(|label| !(done && label.phase == Phase::Exit))
            .map(|label| FrameLabel {
                key: label.key.clone(),
                text: label.text.clone(),
                x: lerp(label.from.0, label.to.0, e),
                y: lerp(label.from.1, label.to.1, e),
                opacity: lerp(label.from.2, label.to.2, e),
            })
            .collect();

        Frame { circles, labels }
    }

    /// Geometry of the surviving nodes at progress `t`.
    ///
    /// Used as the starting point when a newer transition interrupts this one.
    pub fn scene_at(&self, t: f64) -> Scene {
        let e = ease_cubic_in_out(t.clamp(0.0, 1.0));
        let nodes = self
            .tweens
            .iter()
            .filter(|tween| tween.phase != Phase::Exit)
            .map(|tween| SceneNode {
                geometry: tween.from.lerp(tween.to, e),
                ..tween.node.clone()
            })
            .collect();
        Scene::from_nodes(nodes)
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.tweens.iter().filter(|t| t.phase == phase).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameCircle {
    pub key: LayoutKey,
    pub is_leaf: bool,
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub title: String,
    pub phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleStyle {
    pub fill: &'static str,
    pub fill_opacity: f64,
    pub stroke: &'static str,
    pub stroke_width: f64,
}

impl FrameCircle {
    pub fn style(&self) -> CircleStyle {
        if self.is_leaf {
            CircleStyle {
                fill: "#1f77b4",
                fill_opacity: 0.7,
                stroke: "#333",
                stroke_width: 0.5,
            }
        } else {
            CircleStyle {
                fill: "#555",
                fill_opacity: 0.25,
                stroke: "#fff",
                stroke_width: 0.5,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameLabel {
    pub key: LayoutKey,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub opacity: f64,
}

/// Everything needed to draw one instant of the animation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub circles: Vec<FrameCircle>,
    pub labels: Vec<FrameLabel>,
}

impl Frame {
    pub fn circle(&self, key: &str) -> Option<&FrameCircle> {
        self.circles.iter().find(|c| c.key.as_str() == key)
    }

    pub fn label(&self, key: &str) -> Option<&FrameLabel> {
        self.labels.iter().find(|l| l.key.as_str() == key)
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROOT_NAME;
    use crate::pack::FrontChainPacker;

    fn scene(tree: &TreeNode) -> Scene {
        Scene::build(tree, &FrontChainPacker, &ViewConfig::default())
    }

    fn commit_one() -> TreeNode {
        TreeNode::directory(ROOT_NAME, vec![TreeNode::file("a.txt", 10)])
    }

    fn commit_two() -> TreeNode {
        TreeNode::directory(
            ROOT_NAME,
            vec![
                TreeNode::file("a.txt", 10),
                TreeNode::directory("b", vec![TreeNode::file("b.txt", 20)]),
            ],
        )
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("main.rs", 10.0), "main.rs");
        assert_eq!(truncate_label("a_very_long_file_name.rs", 8.0), "a_ver...");
        assert_eq!(truncate_label("abcdef", 5.5), "ab...");
        assert_eq!(truncate_label("abcdef", 6.0), "abcdef");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_easing_endpoints() {
        assert_eq!(ease_cubic_in_out(0.0), 0.0);
        assert_eq!(ease_cubic_in_out(1.0), 1.0);
        assert!((ease_cubic_in_out(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_nodes_matched_by_key() {
        let previous = scene(&commit_one());
        let next = scene(&commit_two());
        let transition = Transition::between(&previous, &next);

        assert_eq!(transition.count(Phase::Update), 2);
        assert_eq!(transition.count(Phase::Enter), 2);
        assert_eq!(transition.count(Phase::Exit), 0);

        let start = transition.sample(0.0);
        let old_a = previous.get(&LayoutKey::root("root").child("a.txt")).unwrap();
        let a = start.circle("root/a.txt").unwrap();
        assert_eq!((a.x, a.y, a.r), (old_a.geometry.x, old_a.geometry.y, old_a.geometry.r));

        let end = transition.sample(1.0);
        let new_a = next.get(&LayoutKey::root("root").child("a.txt")).unwrap();
        let a = end.circle("root/a.txt").unwrap();
        assert!((a.r - new_a.geometry.r).abs() < 1e-9);
    }

    #[test]
    fn test_entering_nodes_grow_from_previous_parent() {
        let previous = scene(&commit_one());
        let next = scene(&commit_two());
        let start = Transition::between(&previous, &next).sample(0.0);

        let old_root = previous.root().unwrap().geometry;
        let b = start.circle("root/b").unwrap();
        assert_eq!(b.phase, Phase::Enter);
        assert_eq!((b.x, b.y), (old_root.x, old_root.y));
        assert!(b.r <= VANISHING_RADIUS);

        // Nested entries fall back to the closest ancestor that existed before.
        let bb = start.circle("root/b/b.txt").unwrap();
        assert_eq!((bb.x, bb.y), (old_root.x, old_root.y));
    }

    #[test]
    fn test_exiting_nodes_shrink_into_surviving_ancestor() {
        let previous = scene(&commit_two());
        let next = scene(&commit_one());
        let transition = Transition::between(&previous, &next);

        assert_eq!(transition.count(Phase::Exit), 2);
        let end_root = next.root().unwrap().geometry;
        let almost = transition.sample(0.999_999);
        let b = almost.circle("root/b/b.txt").unwrap();
        assert!((b.x - end_root.x).abs() < 1e-3);
        assert!(b.r < 1.0);

        let done = transition.sample(1.0);
        assert!(done.circle("root/b").is_none());
        assert!(done.circle("root/b/b.txt").is_none());
    }

    #[test]
    fn test_labels_only_for_large_leaves() {
        let tree = TreeNode::directory(
            ROOT_NAME,
            vec![
                TreeNode::file("huge_file_with_a_long_name.bin", 1_000_000),
                TreeNode::file("tiny.txt", 1),
            ],
        );
        let frame = scene(&tree).frame();

        assert!(frame.label("root/tiny.txt").is_none());
        let label = frame.label("root/huge_file_with_a_long_name.bin").unwrap();
        assert!(label.text.chars().count() <= 30);
        assert!((label.opacity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_interrupted_transition_resumes_midway() {
        let first = scene(&commit_one());
        let second = scene(&commit_two());
        let transition = Transition::between(&first, &second);

        let halfway = transition.scene_at(0.5);
        let b = halfway.get(&LayoutKey::root("root").child("b")).unwrap();
        let target = second.get(&LayoutKey::root("root").child("b")).unwrap();
        assert!(b.geometry.r > VANISHING_RADIUS);
        assert!(b.geometry.r < target.geometry.r);

        let resumed = Transition::between(&halfway, &first).sample(0.0);
        let b = resumed.circle("root/b").unwrap();
        assert_eq!(b.phase, Phase::Exit);
        assert!((b.r - halfway.get(&target.key).unwrap().geometry.r).abs() < 1e-9);
    }

    #[test]
    fn test_titles_carry_path_and_size() {
        let frame = scene(&commit_two()).frame();
        let b = frame.circle("root/b/b.txt").unwrap();

        assert_eq!(b.title, "b/b.txt\n20 bytes");
        assert_eq!(b.style().fill, "#1f77b4");
        assert_eq!(frame.circle("root/b").unwrap().style().fill, "#555");
    }
}
