//! Hierarchical circle packing.
//!
//! Leaves get a radius proportional to the square root of their size,
//! siblings are placed around each other with a front-chain, and every
//! directory is the smallest circle enclosing its children. The finished
//! layout is scaled so the root fills the canvas.

use crate::layout::LayoutKey;
use crate::models::TreeNode;

/// One node of a packed tree, in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedCircle {
    pub key: LayoutKey,
    pub name: String,
    pub depth: usize,
    pub is_leaf: bool,
    /// Aggregate size of the subtree.
    pub value: u64,
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

/// Lays a tree out as nested circles on a `width` x `height` canvas.
///
/// Output is in pre-order with the root first. Children must lie inside
/// their parent and siblings must not overlap. Implementations have to be
/// deterministic for a given tree and canvas.
pub trait Packer: Send + Sync {
    fn pack(&self, tree: &TreeNode, width: f64, height: f64) -> Vec<PackedCircle>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrontChainPacker;

impl Packer for FrontChainPacker {
    fn pack(&self, tree: &TreeNode, width: f64, height: f64) -> Vec<PackedCircle> {
        let mut root = hierarchy(tree, LayoutKey::root(&tree.name), 0);
        let mut random = Lcg::new();
        pack_children(&mut root, &mut random);

        let side = width.min(height);
        root.x = width / 2.0;
        root.y = height / 2.0;
        if root.r > 0.0 {
            let k = side / (2.0 * root.r);
            root.r *= k;
            translate(&mut root, k);
        } else {
            root.r = side / 2.0;
            collapse(&mut root);
        }

        let mut out = Vec::new();
        flatten(root, &mut out);
        out
    }
}

struct Node {
    key: LayoutKey,
    name: String,
    depth: usize,
    is_leaf: bool,
    value: u64,
    x: f64,
    y: f64,
    r: f64,
    children: Vec<Node>,
}

fn hierarchy(tree: &TreeNode, key: LayoutKey, depth: usize) -> Node {
    let mut children: Vec<Node> = tree
        .children()
        .iter()
        .map(|child| hierarchy(child, key.child(&child.name), depth + 1))
        .collect();
    // Larger subtrees first; names break ties so the layout is stable.
    children.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));

    let value = if tree.is_leaf() {
        tree.aggregate_size()
    } else {
        children.iter().map(|c| c.value).sum()
    };

    Node {
        key,
        name: tree.name.clone(),
        depth,
        is_leaf: tree.is_leaf(),
        value,
        x: 0.0,
        y: 0.0,
        r: 0.0,
        children,
    }
}

fn pack_children(node: &mut Node, random: &mut Lcg) {
    if node.is_leaf {
        node.r = (node.value as f64).sqrt();
        return;
    }

    for child in &mut node.children {
        pack_children(child, random);
    }

    // Zero-sized children stay collapsed at the parent's centre.
    let placed: Vec<usize> = node
        .children
        .iter()
        .enumerate()
        .filter(|(_, c)| c.r > 0.0)
        .map(|(i, _)| i)
        .collect();
    let mut circles: Vec<Circle> = placed
        .iter()
        .map(|&i| Circle::new(0.0, 0.0, node.children[i].r))
        .collect();

    node.r = pack_siblings(&mut circles, random);
    for (circle, &i) in circles.iter().zip(&placed) {
        node.children[i].x = circle.x;
        node.children[i].y = circle.y;
    }
}

fn translate(node: &mut Node, k: f64) {
    for child in &mut node.children {
        child.r *= k;
        child.x = node.x + k * child.x;
        child.y = node.y + k * child.y;
        translate(child, k);
    }
}

fn collapse(node: &mut Node) {
    for child in &mut node.children {
        child.x = node.x;
        child.y = node.y;
        child.r = 0.0;
        collapse(child);
    }
}

fn flatten(node: Node, out: &mut Vec<PackedCircle>) {
    out.push(PackedCircle {
        key: node.key,
        name: node.name,
        depth: node.depth,
        is_leaf: node.is_leaf,
        value: node.value,
        x: node.x,
        y: node.y,
        r: node.r,
    });
    for child in node.children {
        flatten(child, out);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Circle {
    x: f64,
    y: f64,
    r: f64,
}

impl Circle {
    fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }
}

/// Linear congruential generator with a fixed seed, so shuffles repeat.
struct Lcg(u64);

impl Lcg {
    const A: u64 = 1_664_525;
    const C: u64 = 1_013_904_223;
    const M: u64 = 1 << 32;

    fn new() -> Self {
        Self(1)
    }

    fn next_f64(&mut self) -> f64 {
        self.0 = (Self::A * self.0 + Self::C) % Self::M;
        self.0 as f64 / Self::M as f64
    }
}

/// Place `c` tangent to both `a` and `b`.
fn place(b: Circle, a: Circle, c: Circle) -> Circle {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;

    if d2 > 0.0 {
        let a2 = (a.r + c.r).powi(2);
        let b2 = (b.r + c.r).powi(2);
        if a2 > b2 {
            let x = (d2 + b2 - a2) / (2.0 * d2);
            let y = (b2 / d2 - x * x).max(0.0).sqrt();
            Circle::new(b.x - x * dx - y * dy, b.y - x * dy + y * dx, c.r)
        } else {
            let x = (d2 + a2 - b2) / (2.0 * d2);
            let y = (a2 / d2 - x * x).max(0.0).sqrt();
            Circle::new(a.x + x * dx - y * dy, a.y + x * dy + y * dx, c.r)
        }
    } else {
        Circle::new(a.x + c.r, a.y, c.r)
    }
}

fn intersects(a: Circle, b: Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Squared distance from the origin to the weighted midpoint of `a` and `b`.
fn score(a: Circle, b: Circle) -> f64 {
    let ab = a.r + b.r;
    let dx = (a.x * b.r + b.x * a.r) / ab;
    let dy = (a.y * b.r + b.y * a.r) / ab;
    dx * dx + dy * dy
}

/// Pack sibling circles around the origin and return the enclosing radius.
fn pack_siblings(circles: &mut [Circle], random: &mut Lcg) -> f64 {
    let n = circles.len();
    if n == 0 {
        return 0.0;
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return circles[0].r;
    }

    circles[0].x = -circles[1].r;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n == 2 {
        return circles[0].r + circles[1].r;
    }

    circles[2] = place(circles[1], circles[0], circles[2]);

    // Front-chain as a circular doubly linked list over indices.
    let mut next = vec![0usize; n];
    let mut prev = vec![0usize; n];
    next[0] = 1;
    prev[1] = 0;
    next[1] = 2;
    prev[2] = 1;
    next[2] = 0;
    prev[0] = 2;

    let mut a = 0;
    let mut b = 1;
    let mut i = 3;

    'pack: while i < n {
        circles[i] = place(circles[a], circles[b], circles[i]);
        let c = i;

        // Find the closest intersecting circle on the front-chain, if any.
        let mut j = next[b];
        let mut k = prev[a];
        let mut sj = circles[b].r;
        let mut sk = circles[a].r;
        loop {
            if sj <= sk {
                if intersects(circles[j], circles[c]) {
                    b = j;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(circles[k], circles[c]) {
                    a = k;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sk += circles[k].r;
                k = prev[k];
            }
            if j == next[k] {
                break;
            }
        }

        prev[c] = a;
        next[c] = b;
        next[a] = c;
        prev[b] = c;
        b = c;

        // New closest pair to the centroid.
        let mut best = score(circles[a], circles[next[a]]);
        let mut cursor = next[c];
        while cursor != b {
            let s = score(circles[cursor], circles[next[cursor]]);
            if s < best {
                a = cursor;
                best = s;
            }
            cursor = next[cursor];
        }
        b = next[a];
        i += 1;
    }

    let mut chain = vec![circles[b]];
    let mut cursor = next[b];
    while cursor != b {
        chain.push(circles[cursor]);
        cursor = next[cursor];
    }

    let e = enclose(chain, random);
    for circle in circles.iter_mut() {
        circle.x -= e.x;
        circle.y -= e.y;
    }
    e.r
}

/// Smallest circle enclosing every circle in `circles`.
fn enclose(mut circles: Vec<Circle>, random: &mut Lcg) -> Circle {
    shuffle(&mut circles, random);

    let mut basis: Vec<Circle> = Vec::new();
    let mut e: Option<Circle> = None;
    let mut i = 0;
    while i < circles.len() {
        let p = circles[i];
        if e.map_or(false, |e| encloses_weak(e, p)) {
            i += 1;
            continue;
        }
        match extend_basis(&basis, p) {
            Some(extended) => {
                basis = extended;
                e = Some(enclose_basis(&basis));
                i = 0;
            }
            None => return bounding_circle(&circles),
        }
    }

    e.unwrap_or_else(|| bounding_circle(&circles))
}

fn shuffle(circles: &mut [Circle], random: &mut Lcg) {
    let mut m = circles.len();
    while m > 0 {
        let i = (random.next_f64() * m as f64) as usize;
        m -= 1;
        circles.swap(m, i);
    }
}

fn extend_basis(basis: &[Circle], p: Circle) -> Option<Vec<Circle>> {
    if encloses_weak_all(p, basis) {
        return Some(vec![p]);
    }

    for &b in basis {
        if encloses_not(p, b) && encloses_weak_all(enclose_basis2(b, p), basis) {
            return Some(vec![b, p]);
        }
    }

    for i in 0..basis.len().saturating_sub(1) {
        for j in (i + 1)..basis.len() {
            let (bi, bj) = (basis[i], basis[j]);
            if encloses_not(enclose_basis2(bi, bj), p)
                && encloses_not(enclose_basis2(bi, p), bj)
                && encloses_not(enclose_basis2(bj, p), bi)
                && encloses_weak_all(enclose_basis3(bi, bj, p), basis)
            {
                return Some(vec![bi, bj, p]);
            }
        }
    }

    None
}

fn encloses_not(a: Circle, b: Circle) -> bool {
    let dr = a.r - b.r;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr < 0.0 || dr * dr < dx * dx + dy * dy
}

fn encloses_weak(a: Circle, b: Circle) -> bool {
    let dr = a.r - b.r + a.r.max(b.r).max(1.0) * 1e-9;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn encloses_weak_all(a: Circle, basis: &[Circle]) -> bool {
    basis.iter().all(|&b| encloses_weak(a, b))
}

fn enclose_basis(basis: &[Circle]) -> Circle {
    match basis {
        [a] => *a,
        [a, b] => enclose_basis2(*a, *b),
        [a, b, c] => enclose_basis3(*a, *b, *c),
        _ => bounding_circle(basis),
    }
}

fn enclose_basis2(a: Circle, b: Circle) -> Circle {
    let x21 = b.x - a.x;
    let y21 = b.y - a.y;
    let r21 = b.r - a.r;
    let l = (x21 * x21 + y21 * y21).sqrt();
    if l == 0.0 {
        return if a.r >= b.r { a } else { b };
    }
    Circle::new(
        (a.x + b.x + x21 / l * r21) / 2.0,
        (a.y + b.y + y21 / l * r21) / 2.0,
        (l + a.r + b.r) / 2.0,
    )
}

fn enclose_basis3(a: Circle, b: Circle, c: Circle) -> Circle {
    let (x1, y1, r1) = (a.x, a.y, a.r);
    let (x2, y2, r2) = (b.x, b.y, b.r);
    let (x3, y3, r3) = (c.x, c.y, c.r);
    let a2 = x1 - x2;
    let a3 = x1 - x3;
    let b2 = y1 - y2;
    let b3 = y1 - y3;
    let c2 = r2 - r1;
    let c3 = r3 - r1;
    let d1 = x1 * x1 + y1 * y1 - r1 * r1;
    let d2 = d1 - x2 * x2 - y2 * y2 + r2 * r2;
    let d3 = d1 - x3 * x3 - y3 * y3 + r3 * r3;
    let ab = a3 * b2 - a2 * b3;
    let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - x1;
    let xb = (b3 * c2 - b2 * c3) / ab;
    let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - y1;
    let yb = (a2 * c3 - a3 * c2) / ab;
    let qa = xb * xb + yb * yb - 1.0;
    let qb = 2.0 * (r1 + xa * xb + ya * yb);
    let qc = xa * xa + ya * ya - r1 * r1;
    let r = -(if qa.abs() > 1e-6 {
        (qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
    } else {
        qc / qb
    });
    Circle::new(x1 + xa + xb * r, y1 + ya + yb * r, r)
}

/// Loose enclosing circle around the centroid; used when the exact search gives up.
fn bounding_circle(circles: &[Circle]) -> Circle {
    if circles.is_empty() {
        return Circle::new(0.0, 0.0, 0.0);
    }
    let n = circles.len() as f64;
    let cx = circles.iter().map(|c| c.x).sum::<f64>() / n;
    let cy = circles.iter().map(|c| c.y).sum::<f64>() / n;
    let r = circles
        .iter()
        .map(|c| ((c.x - cx).powi(2) + (c.y - cy).powi(2)).sqrt() + c.r)
        .fold(0.0, f64::max);
    Circle::new(cx, cy, r)
}
