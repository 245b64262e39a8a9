use glam::Mat4;

use crate::paint::Color;

use super::{Geometry, Light, Material, Transform};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GeometryId(usize);

impl GeometryId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

/// Exponential-squared distance fog.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FogExp2 {
    pub color: Color,
    pub density: f32,
}

impl FogExp2 {
    pub fn new(color: Color, density: f32) -> Self {
        Self { color, density }
    }

    /// Fraction of the fog color mixed in at `depth`.
    pub fn factor(&self, depth: f32) -> f32 {
        let d = self.density * depth;
        (1.0 - (-d * d).exp()).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: GeometryId,
        material: MaterialId,
    },
    Light(Light),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            transform: Transform::IDENTITY,
            visible: true,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena-backed scene graph.
///
/// Nodes are only ever appended, and a parent always precedes its children
/// in the arena, so a single forward pass resolves world matrices.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    geometries: Vec<Geometry>,
    materials: Vec<Material>,
    pub background: Option<Color>,
    pub fog: Option<FogExp2>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Group, None)],
            geometries: Vec::new(),
            materials: Vec::new(),
            background: None,
            fog: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn geometries(&self) -> impl Iterator<Item = (GeometryId, &Geometry)> {
        self.geometries
            .iter()
            .enumerate()
            .map(|(i, g)| (GeometryId(i), g))
    }

    pub fn add_group(&mut self, parent: NodeId) -> NodeId {
        self.insert(parent, NodeKind::Group)
    }

    pub fn add_mesh(
        &mut self,
        parent: NodeId,
        geometry: GeometryId,
        material: MaterialId,
    ) -> NodeId {
        self.insert(parent, NodeKind::Mesh { geometry, material })
    }

    pub fn add_light(&mut self, parent: NodeId, light: Light) -> NodeId {
        self.insert(parent, NodeKind::Light(light))
    }

    fn insert(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        // Foreign ids attach to the root rather than dangling.
        let parent = if parent.0 < self.nodes.len() {
            parent
        } else {
            self.root()
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Deep-copies `source` and its subtree under `parent`.
    ///
    /// Geometry and material references are shared with the source. `parent`
    /// may lie inside the copied subtree; the copy reflects the subtree as it
    /// was before cloning.
    pub fn clone_node(&mut self, source: NodeId, parent: NodeId) -> Option<NodeId> {
        self.nodes.get(source.0)?;

        // Breadth-first snapshot: each entry names its parent's slot.
        let mut order: Vec<(NodeId, Option<usize>)> = vec![(source, None)];
        let mut next = 0;
        while next < order.len() {
            let (id, _) = order[next];
            order.extend(self.nodes[id.0].children.iter().map(|&c| (c, Some(next))));
            next += 1;
        }

        let mut copies: Vec<NodeId> = Vec::with_capacity(order.len());
        for (id, slot) in order {
            let node = &self.nodes[id.0];
            let (kind, transform, visible) = (node.kind.clone(), node.transform, node.visible);
            let target = slot.map_or(parent, |i| copies[i]);

            let copy = self.insert(target, kind);
            self.nodes[copy.0].transform = transform;
            self.nodes[copy.0].visible = visible;
            copies.push(copy);
        }
        copies.first().copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn transform(&self, id: NodeId) -> Option<&Transform> {
        self.nodes.get(id.0).map(|n| &n.transform)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.nodes.get_mut(id.0).map(|n| &mut n.transform)
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id.0)?;
        let local = node.transform.matrix();
        Some(match node.parent {
            Some(parent) => self.world_matrix(parent).unwrap_or(Mat4::IDENTITY) * local,
            None => local,
        })
    }

    /// World matrices of every node, indexed by `NodeId::index`.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut out: Vec<Mat4> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.transform.matrix();
            let world = match node.parent {
                Some(parent) => out[parent.0] * local,
                None => local,
            };
            out.push(world);
        }
        out
    }

    /// A node is drawn only if it and all of its ancestors are visible.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.nodes.get(current.0) {
                Some(node) if node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Material;
    use glam::Vec3;
    use std::f32::consts::PI;

    #[test]
    fn children_inherit_parent_transform() {
        let mut graph = SceneGraph::new();
        let group = graph.add_group(graph.root());
        let geo = graph.add_geometry(Geometry::cuboid(1.0, 1.0, 1.0));
        let mat = graph.add_material(Material::standard(Color::WHITE));
        let mesh = graph.add_mesh(group, geo, mat);

        graph.transform_mut(group).unwrap().position = Vec3::new(0.0, 2.0, 0.0);
        graph.transform_mut(mesh).unwrap().position = Vec3::new(1.0, 0.0, 0.0);

        let world = graph.world_matrix(mesh).unwrap();
        let p = world.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);

        let all = graph.world_matrices();
        assert_eq!(all[mesh.index()], world);
    }

    #[test]
    fn clone_shares_geometry_and_material() {
        let mut graph = SceneGraph::new();
        let geo = graph.add_geometry(Geometry::cylinder(0.06, 0.06, 2.3, 24));
        let mat = graph.add_material(Material::standard(Color::WHITE));
        let arm = graph.add_mesh(graph.root(), geo, mat);
        {
            let t = graph.transform_mut(arm).unwrap();
            t.rotation.z = PI / 2.0;
            t.position = Vec3::new(0.0, 0.05, 0.4);
        }

        let copy = graph.clone_node(arm, graph.root()).unwrap();
        graph.transform_mut(copy).unwrap().position.z = -0.4;

        assert_ne!(copy, arm);
        assert_eq!(graph.node(copy).unwrap().kind, graph.node(arm).unwrap().kind);
        assert_eq!(graph.transform(copy).unwrap().rotation.z, PI / 2.0);
        assert_eq!(graph.transform(arm).unwrap().position.z, 0.4);
        assert_eq!(graph.geometries().count(), 1);
    }

    #[test]
    fn clone_copies_subtree() {
        let mut graph = SceneGraph::new();
        let group = graph.add_group(graph.root());
        graph.add_group(group);
        graph.add_group(group);

        let before = graph.node_count();
        let copy = graph.clone_node(group, graph.root()).unwrap();
        assert_eq!(graph.node_count(), before + 3);
        assert_eq!(graph.node(copy).unwrap().children().len(), 2);
    }

    #[test]
    fn clone_under_own_descendant_copies_original_subtree() {
        let mut graph = SceneGraph::new();
        let a = graph.add_group(graph.root());
        let b = graph.add_group(a);
        let c = graph.add_group(b);

        let before = graph.node_count();
        let copy = graph.clone_node(a, b).unwrap();

        assert_eq!(graph.node_count(), before + 3);
        assert_eq!(graph.node(copy).unwrap().parent(), Some(b));
        assert_eq!(graph.node(b).unwrap().children(), &[c, copy]);

        let copied_b = graph.node(copy).unwrap().children()[0];
        let copied_c = graph.node(copied_b).unwrap().children()[0];
        assert!(graph.node(copied_c).unwrap().children().is_empty());

        // Parents still precede children, so world matrices resolve.
        assert_eq!(graph.world_matrices().len(), graph.node_count());
    }

    #[test]
    fn clone_of_unknown_node_is_none() {
        let mut graph = SceneGraph::new();
        assert_eq!(graph.clone_node(NodeId(42), graph.root()), None);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn hidden_parent_hides_children() {
        let mut graph = SceneGraph::new();
        let group = graph.add_group(graph.root());
        let child = graph.add_group(group);
        assert!(graph.is_visible(child));

        graph.nodes[group.0].visible = false;
        assert!(!graph.is_visible(child));
    }

    #[test]
    fn fog_factor_grows_with_depth() {
        let fog = FogExp2::new(Color::from_hex(0x050506), 0.02);
        assert_eq!(fog.factor(0.0), 0.0);
        assert!(fog.factor(10.0) < fog.factor(50.0));
        assert!((fog.factor(10.0) - (1.0 - (-0.04f32).exp())).abs() < 1e-6);
    }
}
