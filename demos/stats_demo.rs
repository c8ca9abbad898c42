use clap::Parser;
use clap::ValueEnum;
use robin_shift::DefaultHashBuilder;
use robin_shift::HashMap;
use robin_shift::growth_policy::GrowthPolicy;
use robin_shift::growth_policy::Modulo;
use robin_shift::growth_policy::PowerOfTwo;
use robin_shift::node::Boxed;
use robin_shift::node::Inline;
use robin_shift::node::Storage;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    PowerOfTwo,
    Modulo,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    #[arg(short = 'p', long, value_enum, default_value_t = Policy::PowerOfTwo)]
    policy: Policy,

    #[arg(short = 'l', long = "max_load_factor", default_value_t = 0.875)]
    max_load_factor: f32,

    /// Store entries behind pointers instead of inline.
    #[arg(long)]
    node: bool,
}

fn fill<P, St>(args: &Args, policy: P)
where
    P: GrowthPolicy,
    St: Storage,
{
    let mut map: HashMap<u64, u64, DefaultHashBuilder, P, _, St> =
        HashMap::with_capacity_policy_and_hasher_in(
            args.target_capacity,
            DefaultHashBuilder::default(),
            policy,
            allocator_api2::alloc::Global,
        );
    map.set_max_load_factor(args.max_load_factor);

    let initial_capacity = map.capacity();
    println!("Actual capacity: {initial_capacity}");
    println!("Filling map up to its load threshold...");

    let target = (initial_capacity as f64 * args.max_load_factor as f64) as u64;
    for value in 0..target {
        map.insert(value, value.wrapping_mul(31));
    }

    println!("Inserted {} values", map.len());
    if map.capacity() != initial_capacity {
        println!(
            "Map grew from {} to {} slots before reaching the threshold",
            initial_capacity,
            map.capacity()
        );
    }
    println!("Final load factor: {:.2}%", map.load_factor() * 100.0);

    map.probe_histogram().print();
    map.debug_stats().print();
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating {:?} map ({}) with target capacity: {}",
        args.policy,
        if args.node { "node" } else { "inline" },
        args.target_capacity
    );

    match (args.policy, args.node) {
        (Policy::PowerOfTwo, false) => fill::<_, Inline>(&args, PowerOfTwo),
        (Policy::PowerOfTwo, true) => fill::<_, Boxed>(&args, PowerOfTwo),
        (Policy::Modulo, false) => fill::<_, Inline>(&args, Modulo),
        (Policy::Modulo, true) => fill::<_, Boxed>(&args, Modulo),
    }
}
