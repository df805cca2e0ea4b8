//! Chained extension across consecutive sections.
//!
//! Splits a pair of sequences into two section pairs and extends one
//! alignment across both fills, the way a graph driver would extend across
//! nodes: each fill resumes the DP state saved in the previous joint tail.
//!
//!     cargo run --example chain

use sb_types::CostModel;
use semiband::{
    build_section, build_section_pair, build_seq_pair, Params, Section, Session, Status,
};

fn main() {
    let (a, b) = sb_generate::seeded_pair(4000, 0.05, 0.05, 8, 42);
    let (alen, blen) = (a.len() as i32, b.len() as i32);

    let session = Session::init(&Params {
        xdrop: 200,
        score_matrix: CostModel::simple(2, 3, 5, 1),
        ..Params::default()
    })
    .expect("usable scoring schema");
    let mut dp = session
        .dp_init(build_seq_pair(&a, alen, &b, blen), None)
        .expect("dp context");

    // First half, with the second half visible as window lookahead.
    let (ha, hb) = (alen / 2, blen / 2);
    let first = build_section_pair(
        build_section(0, ha, 0, hb),
        build_section(ha, alen - ha, hb, blen - hb),
        2 * (alen + blen),
    );
    let second = build_section_pair(
        build_section(ha, alen - ha, hb, blen - hb),
        Section::default(),
        2 * (alen + blen),
    );

    let root = dp.dp_build_root(&first).tail.expect("root tail");
    let mid = dp.fill(root, &first);
    let mid_tail = mid.tail.expect("first fill tail");
    println!(
        "first fill : p={} psum={} max={} status={:?}",
        dp.tail(mid_tail).p,
        dp.tail(mid_tail).psum,
        dp.tail(mid_tail).max,
        mid.status,
    );

    if mid.status == Status::Cont {
        let fin = dp.fill(mid_tail, &second);
        let fin_tail = fin.tail.expect("second fill tail");
        println!(
            "second fill: p={} psum={} max={} status={:?}",
            dp.tail(fin_tail).p,
            dp.tail(fin_tail).psum,
            dp.tail(fin_tail).max,
            fin.status,
        );
        println!("center score at the end: {}", dp.center_score(fin_tail));
    }
}
