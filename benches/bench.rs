// Criterion benchmarks for Elo Sync

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use elo_sync::core::{find_bracket, held_bracket_role, resolve, update_message};
use elo_sync::models::{Bracket, Gamemode, GamemodeConfig, MemberRecord, RatingChange};

fn create_table(bracket_count: usize) -> GamemodeConfig {
    let brackets = (0..bracket_count)
        .map(|i| Bracket {
            role_id: format!("role-{}", i),
            starting_rating: (i * 100) as i32,
            ending_rating: (i * 100 + 99) as i32,
            priority: (bracket_count - i) as i32,
            name: None,
        })
        .collect();

    GamemodeConfig::new(true, brackets)
}

fn create_member(id: usize, rating: i32) -> MemberRecord {
    let mut member = MemberRecord::new(id.to_string(), "guild", format!("player{}", id), "");
    member.current_ratings.insert(Gamemode::OneVOne, rating - 50);
    member.new_ratings.insert(Gamemode::OneVOne, rating);
    member
}

fn bench_find_bracket(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_bracket");

    for bracket_count in [4, 16, 64].iter() {
        let table = create_table(*bracket_count);
        let top = (*bracket_count * 100 - 1) as i32;

        group.bench_with_input(
            BenchmarkId::new("top_bracket", bracket_count),
            bracket_count,
            |b, _| b.iter(|| find_bracket(black_box(top), black_box(&table.brackets))),
        );
    }

    group.finish();
}

fn bench_resolve_guild(c: &mut Criterion) {
    let table = create_table(16);
    let members: Vec<(MemberRecord, Vec<String>)> = (0..1000)
        .map(|i| {
            let rating = ((i * 37) % 1600) as i32;
            let roles = vec!["everyone".to_string(), format!("role-{}", (i * 7) % 16)];
            (create_member(i, rating), roles)
        })
        .collect();

    c.bench_function("resolve_1000_members", |b| {
        b.iter(|| {
            let changed = members
                .iter()
                .filter(|(member, roles)| {
                    let held = held_bracket_role(&table, roles);
                    resolve(member, Gamemode::OneVOne, &table, held).changed
                })
                .count();
            black_box(changed)
        });
    });
}

fn bench_update_message(c: &mut Criterion) {
    let changes: Vec<RatingChange> = (0..500)
        .map(|i| RatingChange {
            member_id: (i / 2).to_string(),
            gamemode: if i % 2 == 0 { Gamemode::OneVOne } else { Gamemode::TwoVTwo },
            previous: Some(1000 + i),
            current: Some(1010 + i),
        })
        .collect();

    c.bench_function("update_message_500_changes", |b| {
        b.iter(|| update_message(black_box(&changes)))
    });
}

criterion_group!(
    benches,
    bench_find_bracket,
    bench_resolve_guild,
    bench_update_message
);

criterion_main!(benches);
