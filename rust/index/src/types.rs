/// One search result: a leaf id and its distance to the query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub id: u64,
}

/// Orders results nearest first, breaking distance ties by id. Collectors
/// return results unordered; callers that need a ranking sort them here.
pub fn sort_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_neighbors() {
        let mut neighbors = vec![
            Neighbor {
                distance: 2.0,
                id: 1,
            },
            Neighbor {
                distance: 0.5,
                id: 9,
            },
            Neighbor {
                distance: 2.0,
                id: 0,
            },
        ];
        sort_neighbors(&mut neighbors);
        let ids = neighbors.iter().map(|n| n.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![9, 0, 1]);
    }
}
