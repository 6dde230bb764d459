//! Screen-space cluster grid geometry
//!
//! X and Y cells are `cluster_size` pixels wide; Z cells are logarithmic
//! depth slices between the near and far planes. Items are binned through
//! their view-space bounding box: the box's corners are projected into
//! cluster space for X/Y and its view-space depth range is mapped through
//! [`ClusterGrid::z_slice`] for Z. This is an axis-aligned approximation,
//! not an exact plane test, and items may land in a few more cells than
//! they strictly touch.

use std::ops::Range;

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec2, Vec3};

/// Inputs that define one frame's grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridParams {
    /// Render target width in pixels
    pub width: u32,
    /// Render target height in pixels
    pub height: u32,
    /// Cluster width/height in pixels
    pub cluster_size: u32,
    /// Number of depth slices
    pub num_z_clusters: u32,
    /// Camera projection matrix (right-handed, view looks down -Z)
    pub projection: Mat4,
    /// Near plane distance
    pub z_near: f32,
    /// Far plane distance
    pub z_far: f32,
    /// Start of the active region in normalized screen coordinates
    pub active_start: Vec2,
    /// End of the active region in normalized screen coordinates
    pub active_end: Vec2,
}

/// Half-open ranges of cells an item overlaps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    /// Columns
    pub x: Range<u32>,
    /// Rows
    pub y: Range<u32>,
    /// Depth slices
    pub z: Range<u32>,
}

impl CellRange {
    /// Number of cells covered
    pub fn len(&self) -> usize {
        self.x.len() * self.y.len() * self.z.len()
    }

    /// Whether the range covers no cell
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `(x, y, z)` lies inside the range
    pub fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        self.x.contains(&x) && self.y.contains(&y) && self.z.contains(&z)
    }
}

/// Grid dimensions and the matrices that map view space into it
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGrid {
    grid_width: u32,
    grid_height: u32,
    num_z_clusters: u32,
    cluster_size: u32,
    cluster_mat: Mat4,
    min_bound: Vec3,
    max_bound: Vec3,
    z_near: f32,
    z_mult: f32,
}

impl ClusterGrid {
    /// Build the grid for one frame
    pub fn new(params: &GridParams) -> Self {
        let cluster_size = params.cluster_size.max(1);
        let num_z_clusters = params.num_z_clusters.max(1);
        let grid_width = params.width.div_ceil(cluster_size);
        let grid_height = params.height.div_ceil(cluster_size);

        let cluster_mat = Self::build_cluster_matrix(params, cluster_size);

        let grid_size = Vec2::new(grid_width as f32, grid_height as f32);
        let start = params.active_start.component_mul(&grid_size);
        let end = params.active_end.component_mul(&grid_size);

        // ln(z_far - z_near + 1) is the largest value the log mapping
        // produces, so dividing by it scales the result to [0, num_z].
        let z_mult = num_z_clusters as f32 / (params.z_far - params.z_near + 1.0).ln();

        Self {
            grid_width,
            grid_height,
            num_z_clusters,
            cluster_size,
            cluster_mat,
            min_bound: Vec3::new(start.x, start.y, -params.z_far),
            max_bound: Vec3::new(end.x, end.y, 0.0),
            z_near: params.z_near,
            z_mult,
        }
    }

    fn build_cluster_matrix(params: &GridParams, cluster_size: u32) -> Mat4 {
        // clip .xy from [-1, 1] to [0, 1]
        let mut m = Mat4::translation(0.5, 0.5, 0.5) * Mat4::scaling(0.5, 0.5, 0.5) * params.projection;

        // active sub-view of the screen
        let mult = params.active_end - params.active_start;
        m = Mat4::translation(params.active_start.x, params.active_start.y, 0.0)
            * Mat4::scaling(mult.x, mult.y, 1.0)
            * m;

        // pixels
        m = Mat4::scaling(params.width as f32, params.height as f32, 1.0) * m;

        // cluster units
        let inv = 1.0 / cluster_size as f32;
        Mat4::scaling(inv, inv, 1.0) * m
    }

    /// Columns
    pub const fn grid_width(&self) -> u32 {
        self.grid_width
    }

    /// Rows
    pub const fn grid_height(&self) -> u32 {
        self.grid_height
    }

    /// Depth slices
    pub const fn num_z_clusters(&self) -> u32 {
        self.num_z_clusters
    }

    /// Cluster width in pixels
    pub const fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    /// Total number of cells
    pub const fn num_clusters(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize * self.num_z_clusters as usize
    }

    /// Logarithmic depth multiplier, already scaled by the slice count
    pub const fn z_mult(&self) -> f32 {
        self.z_mult
    }

    /// Matrix from view space into cluster space (before the perspective divide)
    pub const fn cluster_matrix(&self) -> &Mat4 {
        &self.cluster_mat
    }

    /// Lower clamp bound: `(active_start * grid, -z_far)`
    pub const fn min_bound(&self) -> &Vec3 {
        &self.min_bound
    }

    /// Upper clamp bound: `(active_end * grid, 0)`
    pub const fn max_bound(&self) -> &Vec3 {
        &self.max_bound
    }

    /// Continuous depth slice of a view-space Z value (negative in front of the camera)
    pub fn z_slice(&self, view_z: f32) -> f32 {
        (-view_z - self.z_near + 1.0).ln() * self.z_mult
    }

    /// Flat index of cell `(x, y, z)`
    pub const fn cell_index(&self, x: u32, y: u32, z: u32) -> usize {
        (y as usize * self.grid_width as usize + x as usize) * self.num_z_clusters as usize + z as usize
    }

    /// Map a view-space bounding box into the cells it overlaps.
    ///
    /// Returns `None` when the box is entirely behind the near plane or
    /// entirely outside the active screen region.
    pub fn cell_range(&self, view_min: Vec3, mut view_max: Vec3) -> Option<CellRange> {
        if view_min.z > -self.z_near {
            return None;
        }

        // cap at the near plane so every corner projects with w > 0
        view_max.z = view_max.z.min(-self.z_near);

        let mut proj_min = Vec2::repeat(f32::MAX);
        let mut proj_max = Vec2::repeat(f32::MIN);
        for corner in &utils::box_corners(&view_min, &view_max) {
            let p = utils::transform_homogeneous(&self.cluster_mat, corner);
            debug_assert!(p.w >= 0.0, "projected cluster corner behind the camera");
            let xy = Vec2::new(p.x, p.y) / p.w;
            proj_min = proj_min.inf(&xy);
            proj_max = proj_max.sup(&xy);
        }

        // projected .xy, view-space .z
        let mut cluster_min = Vec3::new(proj_min.x, proj_min.y, view_min.z);
        let mut cluster_max = Vec3::new(proj_max.x, proj_max.y, view_max.z);

        if cluster_min.x > self.max_bound.x
            || cluster_max.x < self.min_bound.x
            || cluster_min.y > self.max_bound.y
            || cluster_max.y < self.min_bound.y
        {
            return None;
        }

        cluster_min = utils::components_min(&utils::components_max(&cluster_min, &self.min_bound), &self.max_bound);
        cluster_max = utils::components_min(&utils::components_max(&cluster_max, &self.min_bound), &self.max_bound);

        let x = (cluster_min.x as u32)..(cluster_max.x.ceil() as u32).min(self.grid_width);
        let y = (cluster_min.y as u32)..(cluster_max.y.ceil() as u32).min(self.grid_height);

        // view-space z grows more negative with distance, so the nearer
        // bound picks the first slice and the farther bound the last
        let z_min = (self.z_slice(cluster_max.z) as u32).min(self.num_z_clusters - 1);
        // exclusive end: clamping to the slice count keeps the farthest
        // slice reachable, and every item covers at least one slice
        let z_max = (self.z_slice(cluster_min.z).ceil() as u32)
            .min(self.num_z_clusters)
            .max(z_min + 1);

        debug_assert!(x.start <= x.end && y.start <= y.end);

        Some(CellRange { x, y, z: z_min..z_max })
    }

    /// Iterate the flat indices of every cell in `range`
    pub fn cells<'a>(&'a self, range: &'a CellRange) -> impl Iterator<Item = usize> + 'a {
        range.x.clone().flat_map(move |x| {
            range.y.clone().flat_map(move |y| range.z.clone().map(move |z| self.cell_index(x, y, z)))
        })
    }
}

/// View-space bounds of a unit box (corners at +-0.5) under `model_view`
pub fn view_bounds_of_unit_box(model_view: &Mat4) -> (Vec3, Vec3) {
    let half = Vec3::repeat(0.5);
    let mut view_min = Vec3::repeat(f32::MAX);
    let mut view_max = Vec3::repeat(f32::MIN);
    for corner in &utils::box_corners(&-half, &half) {
        let p = model_view.transform_point(&(*corner).into());
        view_min = utils::components_min(&view_min, &p.coords);
        view_max = utils::components_max(&view_max, &p.coords);
    }
    (view_min, view_max)
}

/// View-space bounds of a point light.
///
/// The light helper mesh has a half-unit extent, so the box reaches
/// `radius / 2` from the center on each axis.
pub fn view_bounds_of_light(view: &Mat4, position: &Vec3, radius: f32) -> (Vec3, Vec3) {
    let view_pos = view.transform_point(&(*position).into()).coords;
    let half = Vec3::repeat(radius * 0.5);
    (view_pos - half, view_pos + half)
}
