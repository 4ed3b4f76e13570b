//! Extraction and conversion of metrology outputs into engineering units.
//!
//! The ADE9178 reports its outputs as fixed-point register words, read in one burst
//! starting at [`REG_AVRMS`]. Extraction picks positions out of that flat block into
//! named groups; conversion applies one of four numeric laws, with the full-scale
//! codes and formats taken from the ADE9178 datasheet:
//!
//! - plain ratio against a per-quantity full-scale code (power, RMS, power factor)
//! - energy accumulators, combined from a low/high register pair before the ratio
//! - line period, a zero-based count against `sample rate * 2^16`
//! - phase angle, scaled by the matching phase's period measurement
//!
//! Fixed-point and converted values are always produced as a matched pair, see
//! [`extract_outputs`].

use core::f32::consts::PI;

use crate::register::*;

/// Full-scale code for WATT and VA outputs.
pub const POWER_FS_CODE: i32 = 85_829_040;
/// Full-scale code for RMS outputs.
pub const RMS_FS_CODE: i32 = 107_310_840;
/// Full-scale code for power factor outputs.
pub const PF_FS_CODE: i32 = 1 << 27;
/// Metrology sampling rate in Hz. Energy registers accumulate per sample, so energy
/// conversion divides by this once more to reach watt seconds.
pub const SAMPLING_RATE: i32 = 4000;
/// Bit position at which the high energy register joins the low one.
pub const ENERGY_HI_POS: u32 = 13;
/// Fixed-point format of the period registers.
pub const PERIOD_FORMAT: i32 = 1 << 16;
/// Downscale factor from the angle measurement rate to the sampling rate, making the
/// angle/period ratio come out in radians.
pub const ANGLE_SCALE: i32 = 256;
/// Metering phases carrying power, power factor and energy outputs.
pub const NUM_POWER_CHANNELS: usize = 3;

/// Position of an output register inside the block read from [`REG_AVRMS`].
pub fn output_index(reg: u16) -> usize {
    (reg - REG_AVRMS) as usize
}

/// Position of a status register inside the block read from [`REG_STATUS0`].
pub fn status_index(reg: u16) -> usize {
    (reg - REG_STATUS0) as usize
}

/// Copies `dst.len()` register values out of `src` by position,
/// `dst[i] = src[indices[i]]`. Indices are precomputed with [`output_index`] /
/// [`status_index`].
pub fn extract_registers(src: &[i32], indices: &[usize], dst: &mut [i32]) {
    for (value, &index) in dst.iter_mut().zip(indices) {
        *value = src[index];
    }
}

/// Converts active/apparent power register values into fractions of full scale.
pub fn convert_power(src: &[i32], dst: &mut [f32]) {
    for (value, &raw) in dst.iter_mut().zip(src) {
        *value = fix_to_float(raw as i64, POWER_FS_CODE);
    }
}

/// Converts power factor register values into fractions of full scale.
pub fn convert_power_factor(src: &[i32], dst: &mut [f32]) {
    for (value, &raw) in dst.iter_mut().zip(src) {
        *value = fix_to_float(raw as i64, PF_FS_CODE);
    }
}

/// Converts RMS register values into fractions of full scale.
pub fn convert_rms(src: &[i32], dst: &mut [f32]) {
    for (value, &raw) in dst.iter_mut().zip(src) {
        *value = fix_to_float(raw as i64, RMS_FS_CODE);
    }
}

/// Converts energy register pairs into watt seconds. `src` holds low/high word pairs,
/// so `dst` receives `src.len() / 2` outputs.
pub fn convert_energy(src: &[i32], dst: &mut [f32]) {
    for (value, pair) in dst.iter_mut().zip(src.chunks_exact(2)) {
        *value = energy(pair[0], pair[1]);
    }
}

/// Converts period register values into seconds.
pub fn convert_period(src: &[i32], dst: &mut [f32]) {
    for (value, &raw) in dst.iter_mut().zip(src) {
        *value = period(raw);
    }
}

/// Converts angle register values into radians. Angle conversion depends on the line
/// period of the leading phase of each pair, so `periods` must carry one period
/// register value per angle slot, see [`Output`] for the replication pattern.
pub fn convert_angle(angles: &[i32], periods: &[i32], dst: &mut [f32]) {
    for (value, (&raw, &period_raw)) in dst.iter_mut().zip(angles.iter().zip(periods)) {
        *value = angle(raw, period_raw);
    }
}

fn fix_to_float(value: i64, fs_code: i32) -> f32 {
    value as f32 / fs_code as f32
}

fn energy(lo: i32, hi: i32) -> f32 {
    let combined = ((hi as i64) << ENERGY_HI_POS) | lo as i64;
    fix_to_float(combined, POWER_FS_CODE) / SAMPLING_RATE as f32
}

fn period(raw: i32) -> f32 {
    // The register counts from zero, so full scale is reached at raw + 1.
    fix_to_float(raw as i64 + 1, SAMPLING_RATE * PERIOD_FORMAT)
}

fn angle(raw: i32, period_raw: i32) -> f32 {
    (2.0 * PI * raw as f32 * ANGLE_SCALE as f32) / (period_raw as f32 + 1.0)
}

/// Active and apparent power of one phase, register values.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct PowerOutputFix {
    pub active_power: i32,
    pub apparent_power: i32,
}

/// Active and apparent power of one phase, fractions of full scale.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct PowerOutput {
    pub active_power: f32,
    pub apparent_power: f32,
}

/// RMS measures of one channel, register values.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RmsOutputFix {
    /// Filtered RMS.
    pub filtered: i32,
    /// One-cycle RMS.
    pub one_cycle: i32,
    /// Half-cycle RMS.
    pub half_cycle: i32,
    /// Dip detection level, one cycle.
    pub dip_one: i32,
    /// Dip detection level, half cycle.
    pub dip_half: i32,
    /// Swell detection level, one cycle.
    pub swell_one: i32,
    /// Swell detection level, half cycle.
    pub swell_half: i32,
}

/// RMS measures of one channel, fractions of full scale.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct RmsOutput {
    pub filtered: f32,
    pub one_cycle: f32,
    pub half_cycle: f32,
    pub dip_one: f32,
    pub dip_half: f32,
    pub swell_one: f32,
    pub swell_half: f32,
}

/// Energy accumulators of one phase, low/high register pairs.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct EnergyOutputFix {
    pub pos_active_lo: i32,
    pub pos_active_hi: i32,
    pub neg_active_lo: i32,
    pub neg_active_hi: i32,
    pub signed_active_lo: i32,
    pub signed_active_hi: i32,
    pub apparent_lo: i32,
    pub apparent_hi: i32,
}

/// Energy accumulators of one phase in watt seconds.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct EnergyOutput {
    /// Accumulated positive total active energy.
    pub pos_active: f32,
    /// Accumulated negative total active energy.
    pub neg_active: f32,
    /// Accumulated signed total active energy.
    pub signed_active: f32,
    /// Accumulated total apparent energy.
    pub apparent: f32,
}

/// Line periods, register values.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct PeriodOutputFix {
    pub a_period: i32,
    pub b_period: i32,
    pub c_period: i32,
    pub com_period: i32,
}

/// Line periods in seconds.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct PeriodOutput {
    pub a_period: f32,
    pub b_period: f32,
    pub c_period: f32,
    pub com_period: f32,
}

/// Phase angles between channel pairs, register values.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct AngleOutputFix {
    pub av_bv: i32,
    pub bv_cv: i32,
    pub av_cv: i32,
    pub av_ai: i32,
    pub bv_bi: i32,
    pub cv_ci: i32,
    pub ai_bi: i32,
    pub bi_ci: i32,
    pub ai_ci: i32,
}

/// Phase angles between channel pairs in radians.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct AngleOutput {
    pub av_bv: f32,
    pub bv_cv: f32,
    pub av_cv: f32,
    pub av_ai: f32,
    pub bv_bi: f32,
    pub cv_ci: f32,
    pub ai_bi: f32,
    pub bi_ci: f32,
    pub ai_ci: f32,
}

/// Interrupt and error status registers, extracted from the status block.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct StatusOutput {
    pub status0: u32,
    pub status1: u32,
    pub status2: u32,
    pub status3: u32,
    pub error_status: u32,
}

impl StatusOutput {
    /// Extracts the status group from a block of [`STATUS_BLOCK_REGISTERS`] words
    /// read from [`REG_STATUS0`].
    pub fn extract(block: &[i32]) -> Self {
        Self {
            status0: block[status_index(REG_STATUS0)] as u32,
            status1: block[status_index(REG_STATUS1)] as u32,
            status2: block[status_index(REG_STATUS2)] as u32,
            status3: block[status_index(REG_STATUS3)] as u32,
            error_status: block[status_index(REG_ERROR_STATUS)] as u32,
        }
    }
}

/// All metrology output groups as register values.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct OutputFix {
    pub power: [PowerOutputFix; NUM_POWER_CHANNELS],
    pub power_factor: [i32; NUM_POWER_CHANNELS],
    pub rms: [RmsOutputFix; MAX_NUM_CHANNELS],
    pub energy: [EnergyOutputFix; NUM_POWER_CHANNELS],
    pub period: PeriodOutputFix,
    pub angle: AngleOutputFix,
}

/// All metrology output groups in engineering units. The status group comes from a
/// separate register block and is filled through [`StatusOutput::extract`].
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct Output {
    pub power: [PowerOutput; NUM_POWER_CHANNELS],
    pub power_factor: [f32; NUM_POWER_CHANNELS],
    pub rms: [RmsOutput; MAX_NUM_CHANNELS],
    pub energy: [EnergyOutput; NUM_POWER_CHANNELS],
    pub period: PeriodOutput,
    pub angle: AngleOutput,
    pub status: StatusOutput,
}

impl OutputFix {
    /// Extracts every output group from a block of at least
    /// [`OUTPUT_BLOCK_REGISTERS`] words read from [`REG_AVRMS`].
    pub fn extract(block: &[i32]) -> Self {
        let mut out = Self::default();
        for (phase, power) in out.power.iter_mut().enumerate() {
            power.active_power = block[output_index(REG_AWATT) + 2 * phase];
            power.apparent_power = block[output_index(REG_AWATT) + 2 * phase + 1];
        }
        for (phase, pf) in out.power_factor.iter_mut().enumerate() {
            *pf = block[output_index(REG_APF) + phase];
        }
        for (channel, rms) in out.rms.iter_mut().enumerate() {
            // One 12-channel register run per RMS measure.
            rms.filtered = block[channel];
            rms.one_cycle = block[MAX_NUM_CHANNELS + channel];
            rms.half_cycle = block[2 * MAX_NUM_CHANNELS + channel];
            rms.dip_one = block[3 * MAX_NUM_CHANNELS + channel];
            rms.dip_half = block[4 * MAX_NUM_CHANNELS + channel];
            rms.swell_one = block[5 * MAX_NUM_CHANNELS + channel];
            rms.swell_half = block[6 * MAX_NUM_CHANNELS + channel];
        }
        for (phase, energy) in out.energy.iter_mut().enumerate() {
            let base = output_index(REG_APOS_WATTHR_LO) + 8 * phase;
            energy.pos_active_lo = block[base];
            energy.pos_active_hi = block[base + 1];
            energy.neg_active_lo = block[base + 2];
            energy.neg_active_hi = block[base + 3];
            energy.signed_active_lo = block[base + 4];
            energy.signed_active_hi = block[base + 5];
            energy.apparent_lo = block[base + 6];
            energy.apparent_hi = block[base + 7];
        }
        out.period = PeriodOutputFix {
            a_period: block[output_index(REG_APERIOD)],
            b_period: block[output_index(REG_BPERIOD)],
            c_period: block[output_index(REG_CPERIOD)],
            com_period: block[output_index(REG_COM_PERIOD)],
        };
        let angle_base = output_index(REG_ANGL_AV_BV);
        out.angle = AngleOutputFix {
            av_bv: block[angle_base],
            bv_cv: block[angle_base + 1],
            av_cv: block[angle_base + 2],
            av_ai: block[angle_base + 3],
            bv_bi: block[angle_base + 4],
            cv_ci: block[angle_base + 5],
            ai_bi: block[angle_base + 6],
            bi_ci: block[angle_base + 7],
            ai_ci: block[angle_base + 8],
        };
        out
    }
}

impl Output {
    /// Converts extracted register values into engineering units. The status group is
    /// left at its default; fill it from the status block with
    /// [`StatusOutput::extract`].
    pub fn convert(fix: &OutputFix) -> Self {
        let mut out = Self::default();
        for (power, raw) in out.power.iter_mut().zip(&fix.power) {
            power.active_power = fix_to_float(raw.active_power as i64, POWER_FS_CODE);
            power.apparent_power = fix_to_float(raw.apparent_power as i64, POWER_FS_CODE);
        }
        for (pf, &raw) in out.power_factor.iter_mut().zip(&fix.power_factor) {
            *pf = fix_to_float(raw as i64, PF_FS_CODE);
        }
        for (rms, raw) in out.rms.iter_mut().zip(&fix.rms) {
            rms.filtered = fix_to_float(raw.filtered as i64, RMS_FS_CODE);
            rms.one_cycle = fix_to_float(raw.one_cycle as i64, RMS_FS_CODE);
            rms.half_cycle = fix_to_float(raw.half_cycle as i64, RMS_FS_CODE);
            rms.dip_one = fix_to_float(raw.dip_one as i64, RMS_FS_CODE);
            rms.dip_half = fix_to_float(raw.dip_half as i64, RMS_FS_CODE);
            rms.swell_one = fix_to_float(raw.swell_one as i64, RMS_FS_CODE);
            rms.swell_half = fix_to_float(raw.swell_half as i64, RMS_FS_CODE);
        }
        for (energy, raw) in out.energy.iter_mut().zip(&fix.energy) {
            energy.pos_active = self::energy(raw.pos_active_lo, raw.pos_active_hi);
            energy.neg_active = self::energy(raw.neg_active_lo, raw.neg_active_hi);
            energy.signed_active = self::energy(raw.signed_active_lo, raw.signed_active_hi);
            energy.apparent = self::energy(raw.apparent_lo, raw.apparent_hi);
        }
        out.period = PeriodOutput {
            a_period: period(fix.period.a_period),
            b_period: period(fix.period.b_period),
            c_period: period(fix.period.c_period),
            com_period: period(fix.period.com_period),
        };
        // Each angle pair is scaled by the period of its leading phase, so the three
        // phase periods repeat across the nine slots as A, B, C, A, B, C, A, B, C.
        let p = [fix.period.a_period, fix.period.b_period, fix.period.c_period];
        out.angle = AngleOutput {
            av_bv: angle(fix.angle.av_bv, p[0]),
            bv_cv: angle(fix.angle.bv_cv, p[1]),
            av_cv: angle(fix.angle.av_cv, p[2]),
            av_ai: angle(fix.angle.av_ai, p[0]),
            bv_bi: angle(fix.angle.bv_bi, p[1]),
            cv_ci: angle(fix.angle.cv_ci, p[2]),
            ai_bi: angle(fix.angle.ai_bi, p[0]),
            bi_ci: angle(fix.angle.bi_ci, p[1]),
            ai_ci: angle(fix.angle.ai_ci, p[2]),
        };
        out
    }
}

/// Extracts and converts every output group from a block read from [`REG_AVRMS`],
/// returning the register values and the converted values as a matched pair.
pub fn extract_outputs(block: &[i32]) -> (OutputFix, Output) {
    let fix = OutputFix::extract(block);
    let out = Output::convert(&fix);
    (fix, out)
}
