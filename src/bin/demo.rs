//! Minimal demo: builds a two-facet vacuum chamber (a desorbing source wall
//! facing an absorbing wall), runs it for a short wall-clock window, and
//! logs the resulting hit counts. Not a CLI surface for the engine itself —
//! just a manual smoke-test harness.

use std::time::Duration;

use cgmath::{Point3, Vector3};
use vactrace::model::facet::{CountFlags, DesorbType, Facet, OutgassingSource, ParamOr, PlaneBasis, ProfileType, ReflectionLaw};
use vactrace::model::{GlobalParams, Model, Moment, MotionType, OnTheFlyParams};
use vactrace::simulation::{prepare, validate_config, SimulationController};

fn wall(id: u32, origin: Point3<f64>, normal: Vector3<f64>, sticking: f64) -> Facet {
    Facet {
        id,
        indices: vec![0, 1, 2, 3],
        plane: PlaneBasis { origin, u: Vector3::new(1.0, 0.0, 0.0), v: Vector3::new(0.0, 1.0, 0.0), normal, bbox: (0.0, 0.0, 10.0, 10.0) },
        vertices_2d: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
        area: 100.0,
        is_two_sided: false,
        temperature: 300.0,
        opacity: ParamOr::Constant(1.0),
        sticking: ParamOr::Constant(sticking),
        reflection: ReflectionLaw { diffuse: 1.0, specular: 0.0, cosine_n_exponent: 1.0 },
        desorb_type: if sticking == 0.0 { DesorbType::Cosine } else { DesorbType::None },
        outgassing: OutgassingSource::Constant(ParamOr::Constant(if sticking == 0.0 { 1.0 } else { 0.0 })),
        is_moving: false,
        is_volatile: false,
        super_idx: -1,
        super_dest: 0,
        teleport_dest: 0,
        sojourn: None,
        texture: None,
        profile_type: ProfileType::None,
        count: CountFlags::default(),
        angle_map: None,
        angle_map_counts: None,
        histogram_params: None,
        cdf_id: None,
        id_id: None,
    }
}

fn demo_model() -> Model {
    let source = wall(0, Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0), 0.0);
    let mut absorber = wall(1, Point3::new(0.0, 0.0, 50.0), Vector3::new(0.0, 0.0, -1.0), 1.0);
    absorber.count = CountFlags { count_abs: true, ..CountFlags::default() };

    Model {
        vertices: vec![],
        facets: vec![source, absorber],
        superstructures: vec![],
        parameters: vec![],
        moments: vec![Moment { center: 0.5, width: 1.0 }],
        otf: OnTheFlyParams { desorption_limit: Some(50_000), ..OnTheFlyParams::default() },
        global: GlobalParams {
            gas_mass: 28.0,
            use_maxwell: true,
            enable_decay: false,
            halflife: 0.0,
            motion_type: MotionType::None,
            motion_vector1: Vector3::new(0.0, 0.0, 0.0),
            motion_vector2: Vector3::new(0.0, 0.0, 0.0),
            calc_constant_flow: true,
            latest_moment: 1.0,
        },
    }
}

fn main() {
    env_logger::init();

    let prepared = prepare(demo_model()).expect("demo model is structurally valid");
    validate_config(&prepared).expect("demo model has positive outgassing");

    let nb_workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    log::info!("starting {} workers", nb_workers);

    let mut controller = SimulationController::new(prepared, Duration::from_millis(200));
    controller.start(nb_workers, 0xC0FFEE);
    std::thread::sleep(Duration::from_secs(2));
    controller.stop();

    let snapshot = controller.snapshot();
    log::info!("desorbed: {}", snapshot.desorbed_count);
    for (i, c) in snapshot.facet_counters.iter().enumerate() {
        let m = &c.moments[0];
        log::info!("facet {}: hits={:.1} absorbed={:.1}", i, m.hits, m.absorbed);
    }
}
