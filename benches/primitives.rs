use std::time::Instant;

use criterion::{BenchmarkGroup, BenchmarkId, Criterion, measurement::WallTime};
use distmatch::{
    block::Block,
    bsot,
    channel::SimpleChannel,
    oprf::{OprfReceiver, OprfSender},
    ring::Zn,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tokio::runtime::Runtime;

pub fn primitives_benchmark(c: &mut Criterion) {
    // Default runtime for "full" feature is multi-threaded
    let rt = Runtime::new().unwrap();

    let point_exponents = [6, 8, 10];
    let mut g = c.benchmark_group("primitives");
    for exp in point_exponents {
        let points = 2_usize.pow(exp);
        let bench_id = BenchmarkId::new("value sparse OT, n = 256", points);
        g.throughput(criterion::Throughput::Elements(points as u64));
        bench_value_ot(&mut g, &rt, bench_id, points);
    }
}

fn bench_value_ot(
    g: &mut BenchmarkGroup<'_, WallTime>,
    rt: &Runtime,
    bench_id: BenchmarkId,
    points: usize,
) {
    let domain = 256;
    let modulus = 1 << 16;
    g.bench_function(bench_id, |b| {
        b.to_async(rt).iter_custom(|iters| {
            // iter_custom allows us to do the setup here without impacting the tracked time
            let (mut ch1, mut ch2) = SimpleChannel::pair();
            let mut rng1 = ChaCha20Rng::seed_from_u64(42);
            let mut rng2 = ChaCha20Rng::seed_from_u64(43);
            let ord: Vec<Block> = (0..points).map(|_| rng1.random()).collect();
            let tables: Vec<Vec<Vec<Zn>>> = (0..points)
                .map(|_| vec![(0..domain).map(|_| Zn::random(&mut rng1, modulus)).collect()])
                .collect();
            let shares = vec![vec![0]; points];
            let choices: Vec<Vec<usize>> = (0..points)
                .map(|_| vec![rng2.random_range(0..domain)])
                .collect();

            async move {
                let (mut s, mut r) = tokio::try_join!(
                    OprfSender::setup(&mut ch1, &mut rng1, 1),
                    OprfReceiver::setup(&mut ch2, &mut rng2, 1)
                )
                .expect("OPRF setup failed");
                let mut sender = bsot::value::Sender::new(s.remove(0), 1, domain, modulus);
                let mut receiver = bsot::value::Receiver::new(r.remove(0), 1, domain, modulus);
                let now = Instant::now();
                for _ in 0..iters {
                    tokio::try_join!(
                        sender.send(&mut ch1, &mut rng1, &ord, &tables, &shares),
                        receiver.receive(&mut ch2, &mut rng2, &ord, &choices)
                    )
                    .expect("sparse OT failed");
                }
                now.elapsed()
            }
        })
    });
}
