#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bit_vec::BitVec;
    use segcore::prelude::*;
    use segcore::search::result::{INVALID_OFFSET, INVALID_PRIMARY_KEY};

    const VECTOR_FIELD: FieldId = FieldId(101);

    fn segment() -> SegmentGrowing {
        let schema = Schema::builder()
            .add_field(100, "tag", DataType::Int32)
            .add_vector_field(101, "embedding", 2, DistanceMetric::Euclidean)
            .build()
            .unwrap();
        SegmentGrowing::new(Arc::new(schema), SegmentConfig::default().with_chunk_size(2))
            .unwrap()
    }

    /// Insert one row per key; the vector of key `k` is `(k, 0)`.
    fn insert(segment: &SegmentGrowing, keys: &[i64], timestamps: &[Timestamp]) {
        let bytes: Vec<u8> = keys
            .iter()
            .flat_map(|&k| {
                let mut row = (k as i32).to_le_bytes().to_vec();
                row.extend_from_slice(&(k as f32).to_le_bytes());
                row.extend_from_slice(&0f32.to_le_bytes());
                row
            })
            .collect();
        let size = keys.len() as i64;
        let begin = segment.pre_insert(size);
        segment
            .insert(begin, size, keys, timestamps, &RowBatch::new(&bytes, 12, keys.len()))
            .unwrap();
    }

    #[test]
    fn test_growing_search_fills_primary_keys() {
        let segment = segment();
        insert(&segment, &[10, 11, 12, 13], &[1, 2, 3, 4]);

        let result = segment
            .vector_search(
                VECTOR_FIELD,
                &[12.2, 0.0],
                1,
                BitsetView::empty(),
                &SearchParams::new(2),
            )
            .unwrap();
        let hits: Vec<_> = result.hits(0).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].primary_key, 12);
        assert_eq!(hits[1].primary_key, 13);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn test_filter_applies_to_growing_scan() {
        let segment = segment();
        insert(&segment, &[10, 11, 12], &[1, 2, 3]);

        let mut bits = BitVec::from_elem(3, false);
        bits.set(2, true);
        let result = segment
            .vector_search(
                VECTOR_FIELD,
                &[12.0, 0.0],
                1,
                BitsetView::new(&bits),
                &SearchParams::new(3),
            )
            .unwrap();
        assert_eq!(result.seg_offsets, vec![1, 0, INVALID_OFFSET]);
        assert_eq!(result.primary_keys, vec![11, 10, INVALID_PRIMARY_KEY]);
        assert_eq!(result.hit_count(), 2);
    }

    #[test]
    fn test_sealed_index_takes_over_and_honours_filter() {
        let segment = segment();
        insert(&segment, &[10, 11, 12], &[1, 2, 3]);

        // the sealed copy places the rows elsewhere, so its answers are distinguishable
        let index = FlatIndex::new(2, vec![100.0, 0.0, 0.0, 0.0, 50.0, 0.0]).unwrap();
        segment
            .load_index(
                LoadIndexInfo::new(VECTOR_FIELD, Arc::new(index)).with_param(METRIC_TYPE_KEY, "L2"),
            )
            .unwrap();

        let query = [0.0, 0.0];
        let params = SearchParams::new(1);
        let sealed = segment
            .vector_search(VECTOR_FIELD, &query, 1, BitsetView::empty(), &params)
            .unwrap();
        assert_eq!(sealed.seg_offsets, vec![1]);
        assert_eq!(sealed.primary_keys, vec![11]);

        let mut bits = BitVec::from_elem(3, false);
        bits.set(1, true);
        let filtered = segment
            .vector_search(VECTOR_FIELD, &query, 1, BitsetView::new(&bits), &params)
            .unwrap();
        assert_eq!(filtered.seg_offsets, vec![2]);

        assert!(segment.drop_index(VECTOR_FIELD).unwrap());
        let growing = segment
            .vector_search(VECTOR_FIELD, &query, 1, BitsetView::empty(), &params)
            .unwrap();
        assert_eq!(growing.seg_offsets, vec![0]);
        assert_eq!(growing.primary_keys, vec![10]);
    }

    #[test]
    fn test_non_vector_field_rejected() {
        let segment = segment();
        insert(&segment, &[1], &[1]);
        let result = segment.vector_search(
            FieldId(100),
            &[0.0, 0.0],
            1,
            BitsetView::empty(),
            &SearchParams::new(1),
        );
        assert!(matches!(result, Err(SegcoreError::InvalidArgument(_))));

        let result = segment.vector_search(
            FieldId(999),
            &[0.0, 0.0],
            1,
            BitsetView::empty(),
            &SearchParams::new(1),
        );
        assert!(matches!(result, Err(SegcoreError::FieldNotFound(_))));
    }

    #[test]
    fn test_search_at_timestamp_hides_deleted_and_future_rows() {
        let segment = segment();
        insert(&segment, &[1, 2, 3, 4], &[10, 20, 30, 40]);
        let params = SearchParams::new(4);

        let before_delete = segment
            .search(VECTOR_FIELD, &[2.0, 0.0], 1, &params, 22)
            .unwrap();
        let keys: Vec<i64> = before_delete.hits(0).map(|hit| hit.primary_key).collect();
        assert_eq!(keys, vec![2, 1]);

        let begin = segment.pre_delete(1);
        segment.delete(begin, 1, &[2], &[25]).unwrap();

        let result = segment
            .search(VECTOR_FIELD, &[2.0, 0.0], 1, &params, 35)
            .unwrap();
        let keys: Vec<i64> = result.hits(0).map(|hit| hit.primary_key).collect();
        // key 2 is deleted, key 4 was written after the query time
        assert_eq!(keys, vec![1, 3]);
    }

    #[test]
    fn test_request_metric_overrides_field_metric() {
        let segment = segment();
        insert(&segment, &[1, 4], &[1, 2]);

        let params = SearchParams::new(1).with_metric(DistanceMetric::DotProduct);
        let result = segment
            .vector_search(VECTOR_FIELD, &[1.0, 0.0], 1, BitsetView::empty(), &params)
            .unwrap();
        // larger inner product is closer
        assert_eq!(result.primary_keys, vec![4]);
    }
}
