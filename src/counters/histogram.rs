//! Bounce/distance/time-of-flight histograms, recorded on absorption only.
//! Bins are accumulated as weighted counts so low-flux mode's fractional
//! `ori_ratio` contributions add up correctly.

use crate::model::facet::HistogramParams;

#[derive(Debug, Clone, Default)]
pub struct FacetHistograms {
    pub bounce: Option<Vec<f64>>,
    pub distance: Option<Vec<f64>>,
    pub time: Option<Vec<f64>>,
}

impl FacetHistograms {
    pub fn new(params: &HistogramParams) -> Self {
        FacetHistograms {
            bounce: params.bounce.map(|axis| vec![0.0; axis.bin_count]),
            distance: params.distance.map(|axis| vec![0.0; axis.bin_count]),
            time: params.time.map(|axis| vec![0.0; axis.bin_count]),
        }
    }

    pub fn record(&mut self, params: &HistogramParams, bounces: f64, distance_cm: f64, time_s: f64, weight: f64) {
        if let (Some(axis), Some(bins)) = (params.bounce, self.bounce.as_mut()) {
            bins[axis.bin_for(bounces)] += weight;
        }
        if let (Some(axis), Some(bins)) = (params.distance, self.distance.as_mut()) {
            bins[axis.bin_for(distance_cm)] += weight;
        }
        if let (Some(axis), Some(bins)) = (params.time, self.time.as_mut()) {
            bins[axis.bin_for(time_s)] += weight;
        }
    }

    /// Element-wise merge of another worker's histogram into this one.
    pub fn merge_from(&mut self, other: &FacetHistograms) {
        merge_bins(&mut self.bounce, &other.bounce);
        merge_bins(&mut self.distance, &other.distance);
        merge_bins(&mut self.time, &other.time);
    }
}

fn merge_bins(into: &mut Option<Vec<f64>>, from: &Option<Vec<f64>>) {
    if let (Some(a), Some(b)) = (into.as_mut(), from.as_ref()) {
        for (x, y) in a.iter_mut().zip(b.iter()) {
            *x += y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::facet::HistogramAxis;

    #[test]
    fn records_into_correct_bin_and_clamps_overflow() {
        let params = HistogramParams {
            bounce: Some(HistogramAxis { bin_size: 1.0, bin_count: 4 }),
            distance: None,
            time: None,
        };
        let mut h = FacetHistograms::new(&params);
        h.record(&params, 1.5, 0.0, 0.0, 1.0);
        h.record(&params, 99.0, 0.0, 0.0, 2.0);
        let bins = h.bounce.unwrap();
        assert_eq!(bins[1], 1.0);
        assert_eq!(bins[3], 2.0); // overflow lands in the catch-all last bin
    }

    #[test]
    fn merge_sums_matching_bins() {
        let params = HistogramParams {
            bounce: Some(HistogramAxis { bin_size: 1.0, bin_count: 2 }),
            distance: None,
            time: None,
        };
        let mut a = FacetHistograms::new(&params);
        let mut b = FacetHistograms::new(&params);
        a.record(&params, 0.0, 0.0, 0.0, 1.0);
        b.record(&params, 0.0, 0.0, 0.0, 3.0);
        a.merge_from(&b);
        assert_eq!(a.bounce.unwrap()[0], 4.0);
    }
}
